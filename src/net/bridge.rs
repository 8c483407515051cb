//! 学习型网桥
//!
//! 每个端口是一个独立的混杂模式 CSMA/CD 收发器，共享一张
//! MAC→端口转发表。收帧时学习源地址；周期节拍每次从某个输入
//! 队列搬运至多一帧到正确的输出端口，目的未知则向除入端口外的
//! 所有已接线端口洪泛。

use super::addr::MacAddr;
use super::device::Device;
use super::frame::Frame;
use super::id::{ConnectorId, DeviceId, PortNo};
use super::lan::Lan;
use super::lan_world::LanWorld;
use super::nic::{Nic, NicConfig, NicIndication, NicTimerKind};
use crate::queue::CappedQueue;
use crate::sim::{Event, SimTime, Simulator, World};
use crate::trace::TraceEventKind;
use std::any::Any;
use std::collections::HashMap;
use tracing::{debug, trace};

/// 网桥端口：收发器 + 输入队列（输出队列在收发器内）。
struct BridgePort {
    nic: Nic,
    input: CappedQueue<Frame>,
}

/// 多口学习网桥。
pub struct Bridge {
    id: DeviceId,
    name: String,
    ports: Vec<BridgePort>,
    forward_table: HashMap<MacAddr, PortNo>,
    processing_delay: SimTime,
    tick_pending: bool,
    cursor: usize,
}

/// 事件：网桥处理节拍。
#[derive(Debug)]
pub struct BridgeTick {
    pub device: DeviceId,
}

impl Event for BridgeTick {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let BridgeTick { device } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<LanWorld>()
            .expect("world must be LanWorld");
        w.lan.dispatch_device(device, |dev, lan| {
            if let Some(bridge) = dev.as_any_mut().downcast_mut::<Bridge>() {
                bridge.on_tick(sim, lan);
            }
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Bridge {
    pub fn new(id: DeviceId, name: impl Into<String>, processing_delay: SimTime) -> Self {
        Self {
            id,
            name: name.into(),
            ports: Vec::new(),
            forward_table: HashMap::new(),
            processing_delay,
            tick_pending: false,
            cursor: 0,
        }
    }

    /// 建一个 `ports` 口网桥并登记到拓扑，端口 MAC 由世界 RNG 生成。
    pub fn install(
        lan: &mut Lan,
        name: &str,
        ports: usize,
        processing_delay: SimTime,
    ) -> DeviceId {
        let id = lan.add_device(name, |id| Box::new(Bridge::new(id, name, processing_delay)));
        for p in 0..ports {
            let mac = MacAddr::generate(&mut lan.rng);
            let conn = lan.add_connector(id, PortNo(p));
            let nic = Nic::new(
                mac,
                conn,
                NicConfig {
                    promiscuous: true,
                    fifo_capacity: 64,
                },
            );
            bridge_mut(lan, id).ports.push(BridgePort {
                nic,
                input: CappedQueue::new(64),
            });
        }
        id
    }

    pub fn port_connector(&self, port: usize) -> ConnectorId {
        self.ports[port].nic.connector()
    }

    /// 转发表快照（观察用）。
    pub fn forward_table(&self) -> &HashMap<MacAddr, PortNo> {
        &self.forward_table
    }

    /// 端口收到一帧：学习源地址；目的与源在同一端口则丢弃；否则入队并
    /// 安排处理节拍。
    fn on_frame(&mut self, port: PortNo, frame: Frame, sim: &mut Simulator, lan: &mut Lan) {
        self.forward_table.insert(frame.src, port);
        trace!(bridge = %self.name, port = port.0, src = %frame.src, "学习源地址");

        // 同网段丢弃要求两个表项都存在；src 刚学习过，条件退化为 dst 表项同端口
        if !frame.dst.is_broadcast() {
            if let Some(&q) = self.forward_table.get(&frame.dst) {
                if q == port {
                    debug!(bridge = %self.name, port = port.0, dst = %frame.dst, "目的在同一网段，丢弃");
                    lan.stats.bridge_same_segment_drops += 1;
                    return;
                }
            }
        }

        match self.ports[port.0].input.enqueue(frame) {
            Ok(()) => {
                if !self.tick_pending {
                    self.tick_pending = true;
                    sim.schedule_in(self.processing_delay, BridgeTick { device: self.id });
                }
            }
            Err(_) => {
                debug!(bridge = %self.name, port = port.0, "输入队列满，丢帧");
                lan.stats.frames_dropped += 1;
            }
        }
    }

    /// 处理节拍：轮转地从某个非空输入队列搬运一帧，再按需续拍。
    fn on_tick(&mut self, sim: &mut Simulator, lan: &mut Lan) {
        self.tick_pending = false;
        let n = self.ports.len();
        for i in 0..n {
            let p = (self.cursor + i) % n;
            if let Some(frame) = self.ports[p].input.dequeue() {
                self.cursor = (p + 1) % n;
                self.dispatch_frame(PortNo(p), frame, sim, lan);
                break;
            }
        }
        if self.ports.iter().any(|port| !port.input.is_empty()) {
            self.tick_pending = true;
            sim.schedule_in(self.processing_delay, BridgeTick { device: self.id });
        }
    }

    fn dispatch_frame(&mut self, ingress: PortNo, frame: Frame, sim: &mut Simulator, lan: &mut Lan) {
        let egress = if frame.dst.is_broadcast() {
            None
        } else {
            self.forward_table.get(&frame.dst).copied()
        };
        match egress {
            Some(q) if q != ingress => {
                debug!(bridge = %self.name, from = ingress.0, to = q.0, dst = %frame.dst, "转发帧");
                lan.stats.bridge_forwards += 1;
                lan.record(
                    sim.now(),
                    TraceEventKind::BridgeForward {
                        bridge: self.name.clone(),
                        ingress: ingress.0,
                        egress: q.0,
                    },
                );
                if self.ports[q.0].nic.output_frame(sim, frame).is_err() {
                    debug!(bridge = %self.name, port = q.0, "输出队列满，丢帧");
                    lan.stats.frames_dropped += 1;
                }
            }
            Some(_) => {
                // 搬运期间才学到目的与源同端口
                lan.stats.bridge_same_segment_drops += 1;
            }
            None => {
                debug!(bridge = %self.name, from = ingress.0, dst = %frame.dst, "目的未知，洪泛");
                lan.stats.bridge_floods += 1;
                lan.record(
                    sim.now(),
                    TraceEventKind::BridgeFlood {
                        bridge: self.name.clone(),
                        ingress: ingress.0,
                    },
                );
                for q in 0..self.ports.len() {
                    if q == ingress.0 || !lan.is_attached(self.ports[q].nic.connector()) {
                        continue;
                    }
                    if self.ports[q].nic.output_frame(sim, frame.clone()).is_err() {
                        lan.stats.frames_dropped += 1;
                    }
                }
            }
        }
    }
}

/// 借出一个已注册的网桥。
pub fn bridge_mut(lan: &mut Lan, id: DeviceId) -> &mut Bridge {
    lan.device_mut(id)
        .as_any_mut()
        .downcast_mut::<Bridge>()
        .expect("device is a bridge")
}

impl Device for Bridge {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_signal_sense(&mut self, port: PortNo, sim: &mut Simulator, lan: &mut Lan) {
        self.ports[port.0].nic.on_signal_sense(sim, lan);
    }

    fn on_signal_cease(
        &mut self,
        port: PortNo,
        sender: ConnectorId,
        data: Option<Vec<u8>>,
        sim: &mut Simulator,
        lan: &mut Lan,
    ) {
        if let Some(NicIndication::DataReceived(frame)) =
            self.ports[port.0].nic.on_signal_cease(sim, lan, sender, data)
        {
            self.on_frame(port, frame, sim, lan);
        }
    }

    fn on_nic_timer(
        &mut self,
        port: PortNo,
        kind: NicTimerKind,
        sim: &mut Simulator,
        lan: &mut Lan,
    ) {
        // 端口收发器的队列空指示对网桥无进一步动作
        let _ = self.ports[port.0].nic.on_timer(kind, sim, lan);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
