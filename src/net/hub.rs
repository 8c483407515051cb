//! 集线器
//!
//! 纯转发器：把某端口上听到的 sense/cease 按各自电缆的传播时延
//! 重播到其余所有端口，不解析帧，也不增加处理时延。

use super::device::Device;
use super::id::{ConnectorId, DeviceId, PortNo};
use super::lan::Lan;
use crate::sim::Simulator;
use std::any::Any;
use tracing::trace;

/// 多口转发器。
pub struct Hub {
    id: DeviceId,
    name: String,
    connectors: Vec<ConnectorId>,
}

impl Hub {
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            connectors: Vec::new(),
        }
    }

    /// 建一个 `ports` 口集线器并登记到拓扑。
    pub fn install(lan: &mut Lan, name: &str, ports: usize) -> DeviceId {
        let id = lan.add_device(name, |id| Box::new(Hub::new(id, name)));
        for p in 0..ports {
            let conn = lan.add_connector(id, PortNo(p));
            hub_mut(lan, id).connectors.push(conn);
        }
        id
    }

    pub fn port_connector(&self, port: usize) -> ConnectorId {
        self.connectors[port]
    }
}

/// 借出一个已注册的集线器。
pub fn hub_mut(lan: &mut Lan, id: DeviceId) -> &mut Hub {
    lan.device_mut(id)
        .as_any_mut()
        .downcast_mut::<Hub>()
        .expect("device is a hub")
}

impl Device for Hub {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_signal_sense(&mut self, port: PortNo, sim: &mut Simulator, lan: &mut Lan) {
        trace!(hub = %self.name, port = port.0, "集线器重播载波感知");
        for (q, &conn) in self.connectors.iter().enumerate() {
            if q == port.0 {
                continue;
            }
            lan.repeat_sense_from(sim, conn);
        }
    }

    fn on_signal_cease(
        &mut self,
        port: PortNo,
        _sender: ConnectorId,
        data: Option<Vec<u8>>,
        sim: &mut Simulator,
        lan: &mut Lan,
    ) {
        trace!(hub = %self.name, port = port.0, jam = data.is_none(), "集线器重播信号结束");
        for (q, &conn) in self.connectors.iter().enumerate() {
            if q == port.0 {
                continue;
            }
            lan.repeat_cease_from(sim, conn, data.clone());
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
