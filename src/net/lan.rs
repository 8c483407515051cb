//! 局域网拓扑管理
//!
//! 持有设备表、电缆、连接器与名字注册表，并把电缆上的一次发送
//! 翻译成各连接器上的 sense/cease 事件。事件分发采用“取出设备 →
//! 处理 → 放回”的方式避免 &mut self 与 &mut device 的重叠借用。

use super::cable::{AttachError, Cable};
use super::connector::Connector;
use super::device::Device;
use super::id::{CableId, ConnectorId, DeviceId, PortNo};
use super::signal::{SignalCease, SignalSense};
use super::stats::Stats;
use crate::sim::{SimTime, Simulator};
use crate::trace::{TraceEventKind, TraceLogger};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// 局域网世界状态。
pub struct Lan {
    devices: Vec<Option<Box<dyn Device>>>,
    cables: Vec<Cable>,
    connectors: Vec<Connector>,
    names: HashMap<String, DeviceId>,
    pub rng: ChaCha8Rng,
    pub stats: Stats,
    tracer: Option<TraceLogger>,
}

impl Default for Lan {
    fn default() -> Self {
        // 固定种子，保证每次运行退避/失真抽取可重复
        Self::new(0xC5A1_DA7A_5EED_1234)
    }
}

impl Lan {
    pub fn new(seed: u64) -> Self {
        Self {
            devices: Vec::new(),
            cables: Vec::new(),
            connectors: Vec::new(),
            names: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            stats: Stats::default(),
            tracer: None,
        }
    }

    /// 注册设备：`build` 以分配到的 id 构造设备本体，名字进入注册表。
    pub fn add_device<F>(&mut self, name: impl Into<String>, build: F) -> DeviceId
    where
        F: FnOnce(DeviceId) -> Box<dyn Device>,
    {
        let id = DeviceId(self.devices.len());
        self.devices.push(Some(build(id)));
        self.names.insert(name.into(), id);
        id
    }

    /// 按注册名查找设备（供外部控制台/测试观察用）。
    pub fn lookup(&self, name: &str) -> Option<DeviceId> {
        self.names.get(name).copied()
    }

    /// 借出设备。事件分发期间设备被暂时取出，此时调用会 panic，
    /// 因此该方法只应在拓扑搭建和观察阶段使用。
    pub fn device_mut(&mut self, id: DeviceId) -> &mut dyn Device {
        self.devices[id.0]
            .as_deref_mut()
            .expect("device taken during dispatch")
    }

    pub fn add_connector(&mut self, owner: DeviceId, port: PortNo) -> ConnectorId {
        let id = ConnectorId(self.connectors.len());
        self.connectors.push(Connector::new(owner, port));
        id
    }

    pub fn add_cable(&mut self, cable: Cable) -> CableId {
        let id = CableId(self.cables.len());
        self.cables.push(cable);
        id
    }

    /// 把连接器安装到电缆的指定位置。
    pub fn attach(
        &mut self,
        cable: CableId,
        conn: ConnectorId,
        pos_m: f64,
    ) -> Result<(), AttachError> {
        if self.connectors[conn.0].cable.is_some() {
            return Err(AttachError::AlreadyAttached);
        }
        self.cables[cable.0].attach(conn, pos_m)?;
        self.connectors[conn.0].cable = Some(cable);
        Ok(())
    }

    pub fn is_attached(&self, conn: ConnectorId) -> bool {
        self.connectors[conn.0].cable.is_some()
    }

    /// 连接器所在电缆的比特率（未安装返回 None）。
    pub fn bitrate_of(&self, conn: ConnectorId) -> Option<u64> {
        let cable = self.connectors[conn.0].cable?;
        Some(self.cables[cable.0].bitrate_bps())
    }

    /// 连接器所在介质是否半双工（未安装按半双工处理）。
    pub fn is_half_duplex(&self, conn: ConnectorId) -> bool {
        match self.connectors[conn.0].cable {
            Some(cable) => !self.cables[cable.0].full_duplex(),
            None => true,
        }
    }

    /// 从 `src` 连接器向所在电缆发送 `bytes`：
    /// 为每个安装的连接器调度 sense（now+prop）与 cease（now+prop+tx）。
    pub(crate) fn transmit_from(&mut self, sim: &mut Simulator, src: ConnectorId, bytes: Vec<u8>) {
        let Some(cable_id) = self.connectors[src.0].cable else {
            warn!(connector = src.0, "连接器未安装到电缆，丢弃发送");
            self.stats.frames_dropped += 1;
            return;
        };
        let cable = &self.cables[cable_id.0];
        let Some(src_pos) = cable.position_of(src) else {
            warn!(connector = src.0, "电缆上找不到连接器位置");
            return;
        };
        let tx_time = cable.tx_time(bytes.len());
        let full_duplex = cable.full_duplex();
        let targets: Vec<(ConnectorId, f64)> = cable.attachments().to_vec();

        debug!(
            connector = src.0,
            bytes = bytes.len(),
            tx_time = ?tx_time,
            targets = targets.len(),
            "电缆开始传输"
        );

        for (conn, pos) in targets {
            let prop = self.cables[cable_id.0].prop_delay(src_pos, pos);
            let data = self.cables[cable_id.0].distort(&bytes, &mut self.rng);
            // 全双工介质上发送方不会听到自己的载波
            if !(full_duplex && conn == src) {
                sim.schedule_in(prop, SignalSense { connector: conn });
            }
            sim.schedule(
                sim.now().saturating_add(prop).saturating_add(tx_time),
                SignalCease {
                    connector: conn,
                    sender: src,
                    data: Some(data),
                },
            );
        }
    }

    /// 发出阻塞信号：作废 `src` 的所有未触发 cease，再在每个连接器上
    /// 调度载荷为空的 jam-cease。返回 jam 的传输时间供退避计时。
    pub(crate) fn jam_from(&mut self, sim: &mut Simulator, src: ConnectorId) -> SimTime {
        let Some(cable_id) = self.connectors[src.0].cable else {
            return SimTime::ZERO;
        };
        let cancelled = sim.cancel_matching(|ev| {
            ev.as_any()
                .downcast_ref::<SignalCease>()
                .is_some_and(|c| c.sender == src)
        });
        let cable = &self.cables[cable_id.0];
        let src_pos = cable.position_of(src).expect("attached connector");
        // 48 比特阻塞信号
        let jam_time = cable.tx_time_bits(48);
        let targets: Vec<(ConnectorId, f64)> = cable.attachments().to_vec();

        debug!(connector = src.0, cancelled, jam_time = ?jam_time, "发出阻塞信号");
        self.stats.jams += 1;
        self.record(sim.now(), TraceEventKind::Jam { connector: src.0 });

        for (conn, pos) in targets {
            let prop = self.cables[cable_id.0].prop_delay(src_pos, pos);
            // 载波已在途（原 sense 未被取消），jam 只需替换信号结束时刻
            sim.schedule(
                sim.now().saturating_add(prop).saturating_add(jam_time),
                SignalCease {
                    connector: conn,
                    sender: src,
                    data: None,
                },
            );
        }
        jam_time
    }

    /// 集线器转发：把在 `src` 上听到的载波感知重播到同一电缆的其余连接器。
    pub(crate) fn repeat_sense_from(&mut self, sim: &mut Simulator, src: ConnectorId) {
        let Some(cable_id) = self.connectors[src.0].cable else {
            return;
        };
        let cable = &self.cables[cable_id.0];
        let Some(src_pos) = cable.position_of(src) else {
            return;
        };
        let targets: Vec<(ConnectorId, f64)> = cable
            .attachments()
            .iter()
            .copied()
            .filter(|&(c, _)| c != src)
            .collect();
        for (conn, pos) in targets {
            let prop = self.cables[cable_id.0].prop_delay(src_pos, pos);
            sim.schedule_in(prop, SignalSense { connector: conn });
        }
    }

    /// 集线器转发：重播信号结束，发送方视作 `src` 连接器本身。
    pub(crate) fn repeat_cease_from(
        &mut self,
        sim: &mut Simulator,
        src: ConnectorId,
        data: Option<Vec<u8>>,
    ) {
        let Some(cable_id) = self.connectors[src.0].cable else {
            return;
        };
        let cable = &self.cables[cable_id.0];
        let Some(src_pos) = cable.position_of(src) else {
            return;
        };
        let targets: Vec<(ConnectorId, f64)> = cable
            .attachments()
            .iter()
            .copied()
            .filter(|&(c, _)| c != src)
            .collect();
        for (conn, pos) in targets {
            let prop = self.cables[cable_id.0].prop_delay(src_pos, pos);
            sim.schedule_in(
                prop,
                SignalCease {
                    connector: conn,
                    sender: src,
                    data: data.clone(),
                },
            );
        }
    }

    // ---- 事件分发 ----

    pub(crate) fn dispatch_sense(&mut self, conn: ConnectorId, sim: &mut Simulator) {
        self.record(sim.now(), TraceEventKind::SignalSense { connector: conn.0 });
        let Connector { owner, port, .. } = self.connectors[conn.0];
        let Some(mut dev) = self.devices[owner.0].take() else {
            warn!(device = owner.0, "设备在分发期间缺失");
            return;
        };
        dev.on_signal_sense(port, sim, self);
        self.devices[owner.0] = Some(dev);
    }

    pub(crate) fn dispatch_cease(
        &mut self,
        conn: ConnectorId,
        sender: ConnectorId,
        data: Option<Vec<u8>>,
        sim: &mut Simulator,
    ) {
        self.record(
            sim.now(),
            TraceEventKind::SignalCease {
                connector: conn.0,
                jam: data.is_none(),
            },
        );
        let Connector { owner, port, .. } = self.connectors[conn.0];
        let Some(mut dev) = self.devices[owner.0].take() else {
            warn!(device = owner.0, "设备在分发期间缺失");
            return;
        };
        dev.on_signal_cease(port, sender, data, sim, self);
        self.devices[owner.0] = Some(dev);
    }

    pub(crate) fn dispatch_nic_timer(
        &mut self,
        conn: ConnectorId,
        kind: super::nic::NicTimerKind,
        sim: &mut Simulator,
    ) {
        let Connector { owner, port, .. } = self.connectors[conn.0];
        let Some(mut dev) = self.devices[owner.0].take() else {
            warn!(device = owner.0, "设备在分发期间缺失");
            return;
        };
        trace!(device = owner.0, port = port.0, kind = ?kind, "网卡定时器分发");
        dev.on_nic_timer(port, kind, sim, self);
        self.devices[owner.0] = Some(dev);
    }

    pub(crate) fn dispatch_device<F>(&mut self, id: DeviceId, f: F)
    where
        F: FnOnce(&mut dyn Device, &mut Lan),
    {
        let Some(mut dev) = self.devices[id.0].take() else {
            warn!(device = id.0, "设备在分发期间缺失");
            return;
        };
        f(dev.as_mut(), self);
        self.devices[id.0] = Some(dev);
    }

    // ---- 运行轨迹 ----

    /// 打开结构化轨迹记录（确定性对比与离线回放用）。
    pub fn enable_trace(&mut self) {
        self.tracer = Some(TraceLogger::default());
    }

    pub fn record(&mut self, now: SimTime, kind: TraceEventKind) {
        if let Some(t) = &mut self.tracer {
            t.record(now, kind);
        }
    }

    pub fn trace_logger(&self) -> Option<&TraceLogger> {
        self.tracer.as_ref()
    }
}
