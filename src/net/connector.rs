//! 连接器
//!
//! 电缆的端点。连接器最多挂在一根电缆上；位置的权威映射由电缆持有，
//! 连接器只记录归属设备与端口，供信号事件回送到正确的处理者。

use super::id::{CableId, DeviceId, PortNo};

/// 电缆端点。
#[derive(Debug, Clone, Copy)]
pub struct Connector {
    pub owner: DeviceId,
    pub port: PortNo,
    pub cable: Option<CableId>,
}

impl Connector {
    pub fn new(owner: DeviceId, port: PortNo) -> Self {
        Self {
            owner,
            port,
            cable: None,
        }
    }
}
