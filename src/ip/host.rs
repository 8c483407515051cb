//! 主机
//!
//! 主机设备：拥有接口（接口拥有网卡，网卡拥有连接器）、路由表与
//! IPv4 引擎。网卡上行指示在这里接线：收到数据 → 引擎输入，
//! 发送队列空 → 引擎继续排空输出队列。

use super::engine::{Delivery, Ipv4};
use super::packet::{IpPacket, IpProtocol};
use super::routing::{Route, RoutingTable};
use crate::net::{
    Cidr, ConnectorId, Device, DeviceId, Lan, LanWorld, MacAddr, Nic, NicConfig, NicIndication,
    NicTimerKind, PortNo,
};
use crate::sim::{Event, SimTime, Simulator, World};
use std::any::Any;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::debug;

/// 主机 API 错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("unknown interface: {0}")]
    UnknownInterface(String),
    #[error("duplicate interface name: {0}")]
    DuplicateInterface(String),
}

/// 主机参数。
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// 输入队列服务时延（节点处理时延）
    pub nodal_processing_delay: SimTime,
    pub input_queue_capacity: usize,
    pub output_queue_capacity: usize,
    pub nic_fifo_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            nodal_processing_delay: SimTime(20_000),
            input_queue_capacity: 100,
            output_queue_capacity: 100,
            nic_fifo_capacity: 64,
        }
    }
}

/// 网络接口：一块网卡加上三层配置。
pub struct Interface {
    pub name: String,
    pub hostname: String,
    pub nic: Nic,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Option<Ipv4Addr>,
    pub mtu: u16,
}

/// 接口配置。
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    pub name: String,
    pub cidr: Cidr,
    pub gateway: Option<Ipv4Addr>,
    pub mtu: u16,
    /// 不指定则由世界 RNG 生成
    pub mac: Option<MacAddr>,
}

impl InterfaceConfig {
    pub fn new(name: impl Into<String>, cidr: Cidr) -> Self {
        Self {
            name: name.into(),
            cidr,
            gateway: None,
            mtu: 1500,
            mac: None,
        }
    }

    pub fn gateway(mut self, gw: Ipv4Addr) -> Self {
        self.gateway = Some(gw);
        self
    }

    pub fn mtu(mut self, mtu: u16) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }
}

/// 主机定时器类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostTimerKind {
    /// 服务输入队列中的下一个包
    ProcessPackets,
    /// 排空指定接口的输出队列
    EmptySendFifo(usize),
}

/// 事件：主机定时器到期。
#[derive(Debug)]
pub struct HostTimer {
    pub device: DeviceId,
    pub kind: HostTimerKind,
}

impl Event for HostTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let HostTimer { device, kind } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<LanWorld>()
            .expect("world must be LanWorld");
        w.lan.dispatch_device(device, |dev, lan| {
            if let Some(host) = dev.as_any_mut().downcast_mut::<Host>() {
                host.on_timer(kind, sim, lan);
            }
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 主机设备。
pub struct Host {
    id: DeviceId,
    hostname: String,
    nic_fifo_capacity: usize,
    interfaces: Vec<Interface>,
    routing: RoutingTable,
    ipv4: Ipv4,
}

impl Host {
    pub fn new(id: DeviceId, hostname: impl Into<String>, cfg: HostConfig) -> Self {
        let hostname = hostname.into();
        Self {
            id,
            hostname: hostname.clone(),
            nic_fifo_capacity: cfg.nic_fifo_capacity,
            interfaces: Vec::new(),
            routing: RoutingTable::default(),
            ipv4: Ipv4::new(
                id,
                hostname,
                cfg.nodal_processing_delay,
                cfg.input_queue_capacity,
                cfg.output_queue_capacity,
            ),
        }
    }

    /// 按默认参数建主机并登记到拓扑。
    pub fn install(lan: &mut Lan, hostname: &str) -> DeviceId {
        Self::install_with(lan, hostname, HostConfig::default())
    }

    pub fn install_with(lan: &mut Lan, hostname: &str, cfg: HostConfig) -> DeviceId {
        lan.add_device(hostname, |id| Box::new(Host::new(id, hostname, cfg)))
    }

    /// 给主机加一个接口，返回其连接器供安装到电缆。
    pub fn add_interface(
        lan: &mut Lan,
        host: DeviceId,
        cfg: InterfaceConfig,
    ) -> Result<ConnectorId, HostError> {
        let mac = cfg
            .mac
            .unwrap_or_else(|| MacAddr::generate(&mut lan.rng));
        let (port, fifo_capacity, hostname) = {
            let h = host_mut(lan, host);
            if h.interfaces.iter().any(|i| i.name == cfg.name) {
                return Err(HostError::DuplicateInterface(cfg.name));
            }
            (h.interfaces.len(), h.nic_fifo_capacity, h.hostname.clone())
        };
        let conn = lan.add_connector(host, PortNo(port));
        let nic = Nic::new(
            mac,
            conn,
            NicConfig {
                promiscuous: false,
                fifo_capacity,
            },
        );
        host_mut(lan, host).interfaces.push(Interface {
            name: cfg.name,
            hostname,
            nic,
            ip: cfg.cidr.address,
            netmask: cfg.cidr.netmask(),
            gateway: cfg.gateway,
            mtu: cfg.mtu,
        });
        Ok(conn)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    fn interface_index(&self, name: &str) -> Result<usize, HostError> {
        self.interfaces
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| HostError::UnknownInterface(name.to_string()))
    }

    /// 应用发送入口：经指定接口把载荷发往目的地址（传输层打桩为 TCP）。
    pub fn output(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifc_name: &str,
        dst: Ipv4Addr,
        data: &[u8],
    ) -> Result<(), HostError> {
        let ifc = self.interface_index(ifc_name)?;
        self.ipv4
            .output(sim, lan, &mut self.interfaces, ifc, dst, IpProtocol::Tcp, data);
        Ok(())
    }

    /// 低层发送入口：发出一个现成的 IP 包（测试构造 DF 等场景用）。
    pub fn send_packet(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifc_name: &str,
        pkt: IpPacket,
    ) -> Result<(), HostError> {
        let ifc = self.interface_index(ifc_name)?;
        self.ipv4
            .output_packet(sim, lan, &mut self.interfaces, ifc, pkt);
        Ok(())
    }

    pub fn add_route(&mut self, route: Route) {
        self.routing.add(route);
    }

    pub fn remove_route(&mut self, destination: Ipv4Addr, netmask: Ipv4Addr) -> bool {
        self.routing.remove(destination, netmask)
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing
    }

    /// 交付到本机上层的数据报（观察用）。
    pub fn received(&self) -> &[Delivery] {
        self.ipv4.delivered()
    }

    pub fn arp_lookup(&self, now: SimTime, ifc_name: &str, ip: Ipv4Addr) -> Option<MacAddr> {
        let ifc = self.interface_index(ifc_name).ok()?;
        self.ipv4.arp_lookup(now, ifc, ip)
    }

    /// 预置 ARP 表项（演示/测试用）。
    pub fn seed_arp(
        &mut self,
        now: SimTime,
        ifc_name: &str,
        ip: Ipv4Addr,
        mac: MacAddr,
    ) -> Result<(), HostError> {
        let ifc = self.interface_index(ifc_name)?;
        self.ipv4.seed_arp(now, ifc, ip, mac);
        Ok(())
    }

    fn on_timer(&mut self, kind: HostTimerKind, sim: &mut Simulator, lan: &mut Lan) {
        match kind {
            HostTimerKind::ProcessPackets => {
                self.ipv4
                    .process_packets(sim, lan, &mut self.interfaces, &self.routing);
            }
            HostTimerKind::EmptySendFifo(ifc) => {
                self.ipv4
                    .empty_send_fifo(sim, lan, &mut self.interfaces, ifc);
            }
        }
    }
}

/// 借出一个已注册的主机。
pub fn host_mut(lan: &mut Lan, id: DeviceId) -> &mut Host {
    lan.device_mut(id)
        .as_any_mut()
        .downcast_mut::<Host>()
        .expect("device is a host")
}

impl Device for Host {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.hostname
    }

    fn on_signal_sense(&mut self, port: PortNo, sim: &mut Simulator, lan: &mut Lan) {
        self.interfaces[port.0].nic.on_signal_sense(sim, lan);
    }

    fn on_signal_cease(
        &mut self,
        port: PortNo,
        sender: ConnectorId,
        data: Option<Vec<u8>>,
        sim: &mut Simulator,
        lan: &mut Lan,
    ) {
        match self.interfaces[port.0]
            .nic
            .on_signal_cease(sim, lan, sender, data)
        {
            Some(NicIndication::DataReceived(frame)) => {
                debug!(host = %self.hostname, port = port.0, "接口收到帧");
                self.ipv4
                    .on_input(sim, lan, &mut self.interfaces, port.0, frame);
            }
            Some(NicIndication::SendFifoEmpty) => {
                self.ipv4.on_available_to_send(sim, port.0);
            }
            None => {}
        }
    }

    fn on_nic_timer(
        &mut self,
        port: PortNo,
        kind: NicTimerKind,
        sim: &mut Simulator,
        lan: &mut Lan,
    ) {
        if let Some(NicIndication::SendFifoEmpty) =
            self.interfaces[port.0].nic.on_timer(kind, sim, lan)
        {
            self.ipv4.on_available_to_send(sim, port.0);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
