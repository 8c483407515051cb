use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

/// 轨迹事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// 连接器感知到载波
    SignalSense { connector: usize },
    /// 连接器上的信号结束（jam 标记阻塞信号）
    SignalCease { connector: usize, jam: bool },
    /// 发送中的收发器检测到冲突
    Collision { connector: usize },
    /// 发出阻塞信号
    Jam { connector: usize },
    /// 进入指数退避
    Backoff {
        connector: usize,
        attempt: u32,
        wait_ns: u64,
    },
    /// 超过最大重传次数，放弃帧
    TransmissionAborted { connector: usize },
    /// MAC 层接受一帧
    FrameDelivered {
        connector: usize,
        src: String,
        dst: String,
    },
    /// MAC 层丢弃一帧
    FrameDropped { connector: usize, reason: String },
    /// 发出 ARP 请求
    ArpRequest { ifc: String, target: String },
    /// 发出 ARP 响应
    ArpReply { ifc: String, target: String },
    /// 发出 ICMP 报文
    IcmpSent {
        host: String,
        icmp_type: u8,
        code: u8,
        dst: String,
    },
    /// IP 包交付给本机上层
    PacketDelivered {
        host: String,
        src: String,
        protocol: u8,
        len: usize,
    },
    /// IP 包被丢弃
    PacketDropped { host: String, reason: String },
    /// 队列溢出
    QueueOverflow { host: String, queue: String },
    /// 网桥洪泛一帧
    BridgeFlood { bridge: String, ingress: usize },
    /// 网桥定向转发一帧
    BridgeForward {
        bridge: String,
        ingress: usize,
        egress: usize,
    },
}

/// 单条轨迹事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub t_ns: u64,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// 轨迹收集器。
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TraceLogger {
    pub events: Vec<TraceEvent>,
}

impl TraceLogger {
    pub fn record(&mut self, now: SimTime, kind: TraceEventKind) {
        self.events.push(TraceEvent { t_ns: now.0, kind });
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
