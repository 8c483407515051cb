//! 演示和示例代码
//!
//! 包含各种拓扑构建函数和共享类型

use crate::ip::{Host, InterfaceConfig, IpPacket};
use crate::net::{
    bridge_mut, Bridge, Cable, CableConfig, DeviceId, LanWorld, MacAddr,
};
use crate::sim::{Event, SimTime, Simulator, World};
use std::any::Any;
use std::net::Ipv4Addr;
use tracing::warn;

/// 双主机共享介质拓扑配置选项
#[derive(Debug, Clone)]
pub struct CoaxPairOpts {
    pub cable_length_m: f64,
    pub h1_pos_m: f64,
    pub h2_pos_m: f64,
}

impl Default for CoaxPairOpts {
    fn default() -> Self {
        Self {
            cable_length_m: 250.0,
            h1_pos_m: 0.0,
            h2_pos_m: 250.0,
        }
    }
}

/// 双主机拓扑的句柄。
#[derive(Debug, Clone)]
pub struct CoaxPair {
    pub h1: DeviceId,
    pub h2: DeviceId,
    pub h1_ip: Ipv4Addr,
    pub h2_ip: Ipv4Addr,
    pub h1_mac: MacAddr,
    pub h2_mac: MacAddr,
}

/// 两台主机挂在一段 10BASE5 粗缆两端（h1 在 0 m，h2 在末端）。
pub fn build_coax_pair(world: &mut LanWorld, opts: &CoaxPairOpts) -> CoaxPair {
    let lan = &mut world.lan;
    let cable = lan.add_cable(
        Cable::new(CableConfig::ten_base5(opts.cable_length_m)).expect("valid 10BASE5 config"),
    );

    let h1_mac: MacAddr = "AA:AA:AA:AA:AA:AA".parse().expect("mac literal");
    let h2_mac: MacAddr = "BB:BB:BB:BB:BB:BB".parse().expect("mac literal");
    let h1_ip: Ipv4Addr = "192.168.1.2".parse().expect("ip literal");
    let h2_ip: Ipv4Addr = "192.168.1.3".parse().expect("ip literal");

    let h1 = Host::install(lan, "h1");
    let c1 = Host::add_interface(
        lan,
        h1,
        InterfaceConfig::new("eth0", "192.168.1.2/24".parse().expect("cidr literal")).mac(h1_mac),
    )
    .expect("fresh interface name");
    lan.attach(cable, c1, opts.h1_pos_m).expect("attach h1");

    let h2 = Host::install(lan, "h2");
    let c2 = Host::add_interface(
        lan,
        h2,
        InterfaceConfig::new("eth0", "192.168.1.3/24".parse().expect("cidr literal")).mac(h2_mac),
    )
    .expect("fresh interface name");
    lan.attach(cable, c2, opts.h2_pos_m).expect("attach h2");

    CoaxPair {
        h1,
        h2,
        h1_ip,
        h2_ip,
        h1_mac,
        h2_mac,
    }
}

/// 星型网桥拓扑配置选项
#[derive(Debug, Clone)]
pub struct BridgedStarOpts {
    pub stations: usize,
    pub ports: usize,
    pub cable_length_m: f64,
    pub processing_delay: SimTime,
}

impl Default for BridgedStarOpts {
    fn default() -> Self {
        Self {
            stations: 3,
            ports: 4,
            cable_length_m: 250.0,
            processing_delay: SimTime(200),
        }
    }
}

/// 星型网桥拓扑的句柄。
#[derive(Debug, Clone)]
pub struct BridgedStar {
    pub bridge: DeviceId,
    pub hosts: Vec<DeviceId>,
    pub host_ips: Vec<Ipv4Addr>,
}

/// 每个站点经一段 10BASE5 粗缆接到网桥的一个端口。
/// 站点 s 的地址为 192.168.1.(2+s)/24。
pub fn build_bridged_star(world: &mut LanWorld, opts: &BridgedStarOpts) -> BridgedStar {
    assert!(opts.stations <= opts.ports, "more stations than ports");
    let lan = &mut world.lan;
    let bridge = Bridge::install(lan, "bridge0", opts.ports, opts.processing_delay);

    let mut hosts = Vec::with_capacity(opts.stations);
    let mut host_ips = Vec::with_capacity(opts.stations);
    for s in 0..opts.stations {
        let name = format!("h{}", s + 1);
        let ip: Ipv4Addr = format!("192.168.1.{}", 2 + s).parse().expect("ip literal");
        let cidr = format!("{ip}/24").parse().expect("cidr literal");

        let host = Host::install(lan, &name);
        let host_conn = Host::add_interface(lan, host, InterfaceConfig::new("eth0", cidr))
            .expect("fresh interface name");
        let cable = lan.add_cable(
            Cable::new(CableConfig::ten_base5(opts.cable_length_m)).expect("valid 10BASE5 config"),
        );
        let bridge_conn = bridge_mut(lan, bridge).port_connector(s);
        lan.attach(cable, host_conn, 0.0).expect("attach station");
        lan.attach(cable, bridge_conn, opts.cable_length_m)
            .expect("attach bridge port");

        hosts.push(host);
        host_ips.push(ip);
    }

    BridgedStar {
        bridge,
        hosts,
        host_ips,
    }
}

/// 事件：让主机经指定接口发送一段应用载荷。
#[derive(Debug)]
pub struct SendPayload {
    pub host: DeviceId,
    pub ifc: String,
    pub dst: Ipv4Addr,
    pub payload: Vec<u8>,
}

impl Event for SendPayload {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SendPayload {
            host,
            ifc,
            dst,
            payload,
        } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<LanWorld>()
            .expect("world must be LanWorld");
        w.lan.dispatch_device(host, |dev, lan| {
            let Some(host) = dev.as_any_mut().downcast_mut::<Host>() else {
                warn!("SendPayload 的目标不是主机");
                return;
            };
            if let Err(err) = host.output(sim, lan, &ifc, dst, &payload) {
                warn!(%err, "发送载荷失败");
            }
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 事件：让主机经指定接口发出一个现成的 IP 包。
#[derive(Debug)]
pub struct SendPacket {
    pub host: DeviceId,
    pub ifc: String,
    pub packet: IpPacket,
}

impl Event for SendPacket {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SendPacket { host, ifc, packet } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<LanWorld>()
            .expect("world must be LanWorld");
        w.lan.dispatch_device(host, |dev, lan| {
            let Some(host) = dev.as_any_mut().downcast_mut::<Host>() else {
                warn!("SendPacket 的目标不是主机");
                return;
            };
            if let Err(err) = host.send_packet(sim, lan, &ifc, packet) {
                warn!(%err, "发送 IP 包失败");
            }
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
