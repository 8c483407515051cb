//! 网络层模块
//!
//! 此模块包含 IPv4/ICMP/ARP 编解码、路由表、分片重组、
//! 每主机的 IPv4 引擎与主机设备本体。

// 子模块声明
mod arp;
mod engine;
mod host;
mod icmp;
mod packet;
mod reassembly;
mod routing;

// 重新导出公共接口
pub use arp::{ArpCache, ArpEntry, ArpPacket, ARP_ENTRY_TTL};
pub use engine::{fragment, Delivery, Ipv4, L3Payload};
pub use host::{host_mut, Host, HostConfig, HostError, HostTimer, HostTimerKind, Interface, InterfaceConfig};
pub use icmp::IcmpPacket;
pub use packet::{internet_checksum, IpPacket, IpProtocol, DEFAULT_TTL, IP_HEADER_LEN};
pub use reassembly::Reassembly;
pub use routing::{Route, RoutingTable};
