//! 物理层与数据链路层模块
//!
//! 此模块包含共享介质（电缆）、连接器、CSMA/CD 收发器（网卡）、
//! 网桥、集线器以及 802.3 帧编解码。

// 子模块声明
mod addr;
mod bridge;
mod cable;
mod connector;
mod device;
mod frame;
mod hub;
mod id;
mod lan;
mod lan_world;
mod nic;
mod signal;
mod stats;

// 重新导出公共接口
pub use addr::{
    netmask_from_prefix, prefix_len_of, same_subnet, AddrParseError, Cidr, MacAddr,
};
pub use bridge::{bridge_mut, Bridge, BridgeTick};
pub use cable::{AttachError, BurstErrorModel, Cable, CableConfig, CableError};
pub use connector::Connector;
pub use device::Device;
pub use frame::{EtherType, Frame, MAX_PAYLOAD, MIN_PAYLOAD};
pub use hub::{hub_mut, Hub};
pub use id::{CableId, ConnectorId, DeviceId, PortNo};
pub use lan::Lan;
pub use lan_world::LanWorld;
pub use nic::{Nic, NicConfig, NicError, NicIndication, NicTimer, NicTimerKind};
pub use signal::{SignalCease, SignalSense};
pub use stats::Stats;
