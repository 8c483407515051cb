//! 统计信息
//!
//! 定义整网仿真统计数据结构。

/// 网络统计信息
#[derive(Debug, Default)]
pub struct Stats {
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub collisions: u64,
    pub jams: u64,
    pub backoffs: u64,
    pub transmissions_aborted: u64,
    pub bridge_floods: u64,
    pub bridge_forwards: u64,
    pub bridge_same_segment_drops: u64,
    pub packets_delivered: u64,
    pub packets_dropped: u64,
    pub arp_requests: u64,
    pub arp_replies: u64,
    pub icmp_sent: u64,
}
