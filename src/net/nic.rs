//! CSMA/CD 收发器
//!
//! 半双工网卡状态机：发送 FIFO 排空、载波侦听与随机推迟、96 比特时间的
//! 帧间隔、冲突检测 + 阻塞信号 + 截断二进制指数退避，以及 MAC 接收过滤。
//! 上行指示（收到数据 / 发送队列空）作为返回值交给属主设备处理，
//! 不保留任何反向引用。

use super::addr::MacAddr;
use super::frame::{EtherType, Frame};
use super::id::ConnectorId;
use super::lan::Lan;
use super::lan_world::LanWorld;
use crate::queue::CappedQueue;
use crate::sim::{Event, SimTime, Simulator, World};
use crate::trace::TraceEventKind;
use crate::util::WireError;
use rand::Rng;
use std::any::Any;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// 帧间隔：96 比特时间。
const IFG_BITS: u64 = 96;
/// 退避槽：512 比特时间。
const SLOT_BITS: u64 = 512;
/// 最大重传次数，超过则放弃。
const MAX_RETRANSMISSIONS: u32 = 15;

/// 网卡发送错误。
#[derive(Debug, Error)]
pub enum NicError {
    #[error("send fifo full")]
    QueueFull,
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// 网卡构造参数。
#[derive(Debug, Clone, Copy)]
pub struct NicConfig {
    /// 混杂模式：接受所有目的地址（网桥端口用）。
    pub promiscuous: bool,
    pub fifo_capacity: usize,
}

impl Default for NicConfig {
    fn default() -> Self {
        Self {
            promiscuous: false,
            fifo_capacity: 64,
        }
    }
}

/// 网卡向属主设备发出的上行指示。
#[derive(Debug)]
pub enum NicIndication {
    /// 收到一帧（已通过 FCS 与地址过滤）。
    DataReceived(Frame),
    /// 发送 FIFO 已空，可以继续投递。
    SendFifoEmpty,
}

/// 网卡内部定时器类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NicTimerKind {
    /// 取出队头帧开始发送流程
    StartDrain,
    /// IFG 到期，尝试占用介质
    StartTransmission,
    /// 推迟/退避结束，重试发送
    RetryTransmit,
}

/// 事件：网卡定时器到期，经连接器归属分发回设备。
#[derive(Debug)]
pub struct NicTimer {
    pub connector: ConnectorId,
    pub kind: NicTimerKind,
}

impl Event for NicTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let NicTimer { connector, kind } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<LanWorld>()
            .expect("world must be LanWorld");
        w.lan.dispatch_nic_timer(connector, kind, sim);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 半双工 CSMA/CD 收发器。
#[derive(Debug)]
pub struct Nic {
    mac: MacAddr,
    connector: ConnectorId,
    promiscuous: bool,
    /// 正在驱动介质
    tx: bool,
    /// 正在感知任何载波
    rx: bool,
    retransmission_count: u32,
    /// 正在发送（或等待重试）的帧字节
    pending: Option<Vec<u8>>,
    fifo: CappedQueue<Frame>,
    emptying_fifo: bool,
}

impl Nic {
    pub fn new(mac: MacAddr, connector: ConnectorId, cfg: NicConfig) -> Self {
        Self {
            mac,
            connector,
            promiscuous: cfg.promiscuous,
            tx: false,
            rx: false,
            retransmission_count: 0,
            pending: None,
            fifo: CappedQueue::new(cfg.fifo_capacity),
            emptying_fifo: false,
        }
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn connector(&self) -> ConnectorId {
        self.connector
    }

    pub fn fifo_len(&self) -> usize {
        self.fifo.len()
    }

    /// 把载荷封帧（计算 FCS 的工作在序列化时完成）并入队。
    pub fn output(
        &mut self,
        sim: &mut Simulator,
        dst: MacAddr,
        ether_type: EtherType,
        payload: Vec<u8>,
    ) -> Result<(), NicError> {
        let frame = Frame::new(dst, self.mac, ether_type, payload)?;
        self.output_frame(sim, frame)
    }

    /// 入队一个现成的帧（网桥转发保留原始源地址时使用）。
    pub fn output_frame(&mut self, sim: &mut Simulator, frame: Frame) -> Result<(), NicError> {
        self.fifo.enqueue(frame).map_err(|_| NicError::QueueFull)?;
        if !self.emptying_fifo {
            self.emptying_fifo = true;
            sim.schedule_in(
                SimTime::ZERO,
                NicTimer {
                    connector: self.connector,
                    kind: NicTimerKind::StartDrain,
                },
            );
        }
        Ok(())
    }

    /// 定时器入口。
    pub fn on_timer(
        &mut self,
        kind: NicTimerKind,
        sim: &mut Simulator,
        lan: &mut Lan,
    ) -> Option<NicIndication> {
        match kind {
            NicTimerKind::StartDrain => self.start_drain(sim, lan),
            NicTimerKind::StartTransmission => {
                self.start_transmission(sim, lan);
                None
            }
            NicTimerKind::RetryTransmit => {
                if let Some(bytes) = self.pending.take() {
                    self.transmit(sim, lan, bytes);
                }
                None
            }
        }
    }

    fn start_drain(&mut self, sim: &mut Simulator, lan: &mut Lan) -> Option<NicIndication> {
        match self.fifo.dequeue() {
            Some(frame) => {
                trace!(connector = self.connector.0, "取出队头帧，开始发送");
                let bytes = frame.to_bytes();
                self.transmit(sim, lan, bytes);
                None
            }
            None => {
                self.emptying_fifo = false;
                Some(NicIndication::SendFifoEmpty)
            }
        }
    }

    /// 发送入口：介质忙则随机推迟 10–15 µs，否则等满一个 IFG 再占用介质。
    fn transmit(&mut self, sim: &mut Simulator, lan: &mut Lan, bytes: Vec<u8>) {
        self.pending = Some(bytes);
        if self.rx && lan.is_half_duplex(self.connector) {
            self.defer(sim, lan);
            return;
        }
        let Some(bitrate) = lan.bitrate_of(self.connector) else {
            warn!(connector = self.connector.0, "网卡未接入介质，丢帧");
            self.pending = None;
            lan.stats.frames_dropped += 1;
            return;
        };
        sim.schedule_in(
            SimTime(bittimes_ns(IFG_BITS, bitrate)),
            NicTimer {
                connector: self.connector,
                kind: NicTimerKind::StartTransmission,
            },
        );
    }

    fn defer(&mut self, sim: &mut Simulator, lan: &mut Lan) {
        let delay = SimTime(lan.rng.gen_range(10_000..=15_000));
        trace!(connector = self.connector.0, delay = ?delay, "介质忙，推迟发送");
        sim.schedule_in(
            delay,
            NicTimer {
                connector: self.connector,
                kind: NicTimerKind::RetryTransmit,
            },
        );
    }

    /// IFG 到期：介质仍空闲则占用并驱动电缆，否则重新进入推迟。
    fn start_transmission(&mut self, sim: &mut Simulator, lan: &mut Lan) {
        if self.rx && lan.is_half_duplex(self.connector) {
            self.defer(sim, lan);
            return;
        }
        let Some(bytes) = self.pending.clone() else {
            return;
        };
        self.tx = true;
        debug!(connector = self.connector.0, bytes = bytes.len(), "占用介质，开始传输");
        lan.transmit_from(sim, self.connector, bytes);
    }

    /// 载波感知：发送中再感知到别的载波即为冲突。
    pub fn on_signal_sense(&mut self, sim: &mut Simulator, lan: &mut Lan) {
        if self.rx && self.tx && lan.is_half_duplex(self.connector) {
            debug!(connector = self.connector.0, "检测到冲突");
            lan.stats.collisions += 1;
            lan.record(
                sim.now(),
                TraceEventKind::Collision {
                    connector: self.connector.0,
                },
            );
            let jam_time = lan.jam_from(sim, self.connector);
            self.exponential_backoff(jam_time, sim, lan);
        } else {
            self.rx = true;
        }
    }

    /// 截断二进制指数退避。冲突后直到自己的 jam-cease 到达才回到空闲。
    fn exponential_backoff(&mut self, jam_time: SimTime, sim: &mut Simulator, lan: &mut Lan) {
        self.retransmission_count += 1;
        let n = self.retransmission_count;
        if n > MAX_RETRANSMISSIONS {
            warn!(connector = self.connector.0, "超过最大重传次数，放弃该帧");
            lan.stats.transmissions_aborted += 1;
            lan.record(
                sim.now(),
                TraceEventKind::TransmissionAborted {
                    connector: self.connector.0,
                },
            );
            self.retransmission_count = 0;
            self.pending = None;
            // 继续发送队列里的后续帧
            sim.schedule_in(
                SimTime::ZERO,
                NicTimer {
                    connector: self.connector,
                    kind: NicTimerKind::StartDrain,
                },
            );
            return;
        }
        let Some(bitrate) = lan.bitrate_of(self.connector) else {
            return;
        };
        let slot = bittimes_ns(SLOT_BITS, bitrate);
        let c = lan.rng.gen_range(0..(1u64 << n.min(10)));
        let wait = jam_time.saturating_add(SimTime(c.saturating_mul(slot)));
        debug!(
            connector = self.connector.0,
            attempt = n,
            slots = c,
            wait = ?wait,
            "进入指数退避"
        );
        lan.stats.backoffs += 1;
        lan.record(
            sim.now(),
            TraceEventKind::Backoff {
                connector: self.connector.0,
                attempt: n,
                wait_ns: wait.0,
            },
        );
        sim.schedule_in(
            wait,
            NicTimer {
                connector: self.connector,
                kind: NicTimerKind::RetryTransmit,
            },
        );
    }

    /// 信号结束：jam 丢弃；自己的发送完成则继续排空或上报队列空；
    /// 其余进入 MAC 接收路径。
    pub fn on_signal_cease(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        sender: ConnectorId,
        data: Option<Vec<u8>>,
    ) -> Option<NicIndication> {
        self.rx = false;
        self.tx = false;

        let Some(bytes) = data else {
            // 阻塞信号：丢弃，退避定时器已在运行
            return None;
        };

        if sender == self.connector {
            // 自己的传输正常结束
            self.pending = None;
            self.retransmission_count = 0;
            if self.fifo.is_empty() {
                self.emptying_fifo = false;
                return Some(NicIndication::SendFifoEmpty);
            }
            sim.schedule_in(
                SimTime::ZERO,
                NicTimer {
                    connector: self.connector,
                    kind: NicTimerKind::StartDrain,
                },
            );
            return None;
        }

        self.receive(sim, lan, &bytes)
    }

    /// MAC 接收：校验 FCS、丢自己的帧、按目的地址过滤。
    fn receive(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        bytes: &[u8],
    ) -> Option<NicIndication> {
        let frame = match Frame::from_bytes(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(connector = self.connector.0, %err, "帧校验失败，丢弃");
                lan.stats.frames_dropped += 1;
                lan.record(
                    sim.now(),
                    TraceEventKind::FrameDropped {
                        connector: self.connector.0,
                        reason: err.to_string(),
                    },
                );
                return None;
            }
        };
        if frame.src == self.mac {
            return None;
        }
        if !self.promiscuous && frame.dst != self.mac && !frame.dst.is_broadcast() {
            return None;
        }
        lan.stats.frames_delivered += 1;
        lan.record(
            sim.now(),
            TraceEventKind::FrameDelivered {
                connector: self.connector.0,
                src: frame.src.to_string(),
                dst: frame.dst.to_string(),
            },
        );
        Some(NicIndication::DataReceived(frame))
    }
}

/// n 个比特时间对应的纳秒数（向上取整）。
fn bittimes_ns(bits: u64, bitrate: u64) -> u64 {
    let nanos = ((bits as u128) * 1_000_000_000u128 + (bitrate as u128 - 1)) / bitrate as u128;
    nanos.min(u64::MAX as u128) as u64
}
