//! 信号事件
//!
//! 定义介质上的载波感知 / 信号结束事件，经设备表分发给连接器属主。

use super::id::ConnectorId;
use super::lan_world::LanWorld;
use crate::sim::{Event, Simulator, World};
use std::any::Any;
use tracing::trace;

/// 事件：连接器感知到载波。
#[derive(Debug)]
pub struct SignalSense {
    pub connector: ConnectorId,
}

impl Event for SignalSense {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SignalSense { connector } = *self;
        trace!(connector = connector.0, now = ?sim.now(), "信号感知事件");
        let w = world
            .as_any_mut()
            .downcast_mut::<LanWorld>()
            .expect("world must be LanWorld");
        w.lan.dispatch_sense(connector, sim);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 事件：连接器上的信号结束，携带（可能失真的）字节流。
/// `data == None` 标识阻塞信号（jam）。
pub struct SignalCease {
    pub connector: ConnectorId,
    pub sender: ConnectorId,
    pub data: Option<Vec<u8>>,
}

impl SignalCease {
    pub fn is_jam(&self) -> bool {
        self.data.is_none()
    }
}

impl Event for SignalCease {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SignalCease {
            connector,
            sender,
            data,
        } = *self;
        trace!(
            connector = connector.0,
            sender = sender.0,
            jam = data.is_none(),
            now = ?sim.now(),
            "信号结束事件"
        );
        let w = world
            .as_any_mut()
            .downcast_mut::<LanWorld>()
            .expect("world must be LanWorld");
        w.lan.dispatch_cease(connector, sender, data, sim);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
