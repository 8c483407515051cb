use crate::demo::SendPayload;
use crate::ip::{host_mut, Host, InterfaceConfig};
use crate::net::{hub_mut, Cable, CableConfig, DeviceId, Hub, LanWorld};
use crate::sim::{SimTime, Simulator};
use std::net::Ipv4Addr;

fn build_hub_star(world: &mut LanWorld, stations: usize) -> (DeviceId, Vec<DeviceId>, Vec<Ipv4Addr>) {
    let lan = &mut world.lan;
    let hub = Hub::install(lan, "hub0", stations);

    let mut hosts = Vec::new();
    let mut ips = Vec::new();
    for s in 0..stations {
        let ip: Ipv4Addr = format!("192.168.1.{}", 2 + s).parse().expect("ip literal");
        let host = Host::install(lan, &format!("h{}", s + 1));
        let conn = Host::add_interface(
            lan,
            host,
            InterfaceConfig::new("eth0", format!("{ip}/24").parse().expect("cidr literal")),
        )
        .expect("fresh interface name");
        let cable =
            lan.add_cable(Cable::new(CableConfig::ten_base5(250.0)).expect("valid config"));
        let hub_conn = hub_mut(lan, hub).port_connector(s);
        lan.attach(cable, conn, 0.0).expect("attach station");
        lan.attach(cable, hub_conn, 250.0).expect("attach hub port");
        hosts.push(host);
        ips.push(ip);
    }
    (hub, hosts, ips)
}

#[test]
fn hub_repeats_frames_across_segments() {
    let mut sim = Simulator::default();
    let mut world = LanWorld::with_seed(5);
    let (_hub, hosts, ips) = build_hub_star(&mut world, 3);

    sim.schedule(
        SimTime::ZERO,
        SendPayload {
            host: hosts[0],
            ifc: "eth0".into(),
            dst: ips[1],
            payload: vec![7, 7, 7],
        },
    );
    sim.run(&mut world);
    let now = sim.now();

    // 载荷穿过集线器送达 h2；h3 的网卡按目的地址滤掉
    assert_eq!(
        host_mut(&mut world.lan, hosts[1]).received()[0].data,
        vec![7, 7, 7]
    );
    assert!(host_mut(&mut world.lan, hosts[2]).received().is_empty());

    // ARP 广播被重播到所有网段：h2、h3 都学到 h1
    let h1_mac = host_mut(&mut world.lan, hosts[0])
        .interface("eth0")
        .expect("eth0")
        .nic
        .mac();
    assert_eq!(
        host_mut(&mut world.lan, hosts[1]).arp_lookup(now, "eth0", ips[0]),
        Some(h1_mac)
    );
    assert_eq!(
        host_mut(&mut world.lan, hosts[2]).arp_lookup(now, "eth0", ips[0]),
        Some(h1_mac)
    );
}
