use crate::demo::{build_bridged_star, BridgedStarOpts, SendPayload};
use crate::ip::host_mut;
use crate::net::{bridge_mut, LanWorld, MacAddr, PortNo};
use crate::sim::{SimTime, Simulator};

#[test]
fn bridge_floods_once_learns_then_forwards_unicast() {
    let mut sim = Simulator::default();
    let mut world = LanWorld::with_seed(3);
    let star = build_bridged_star(&mut world, &BridgedStarOpts::default());

    // h1 → h3：第一帧是 ARP 广播（洪泛），其后全部单播
    sim.schedule(
        SimTime::ZERO,
        SendPayload {
            host: star.hosts[0],
            ifc: "eth0".into(),
            dst: star.host_ips[2],
            payload: vec![1, 2, 3, 4],
        },
    );
    sim.run(&mut world);

    // 载荷送达 h3，h2 只旁听到广播、没有任何交付
    assert_eq!(
        host_mut(&mut world.lan, star.hosts[2]).received()[0].data,
        vec![1, 2, 3, 4]
    );
    assert!(host_mut(&mut world.lan, star.hosts[1]).received().is_empty());

    let h1_mac = host_mac(&mut world, &star.hosts, 0);
    let h3_mac = host_mac(&mut world, &star.hosts, 2);
    let bridge = bridge_mut(&mut world.lan, star.bridge);
    assert_eq!(bridge.forward_table().get(&h1_mac), Some(&PortNo(0)));
    assert_eq!(bridge.forward_table().get(&h3_mac), Some(&PortNo(2)));

    // 洪泛恰好一次；应答与数据帧都按表定向转发
    assert_eq!(world.lan.stats.bridge_floods, 1);
    assert_eq!(world.lan.stats.bridge_forwards, 2);
}

#[test]
fn learned_destination_is_never_flooded_again() {
    let mut sim = Simulator::default();
    let mut world = LanWorld::with_seed(3);
    let star = build_bridged_star(&mut world, &BridgedStarOpts::default());

    for (at, payload) in [(SimTime::ZERO, vec![1u8]), (SimTime::from_millis(20), vec![2])] {
        sim.schedule(
            at,
            SendPayload {
                host: star.hosts[0],
                ifc: "eth0".into(),
                dst: star.host_ips[2],
                payload,
            },
        );
    }
    sim.run(&mut world);

    assert_eq!(host_mut(&mut world.lan, star.hosts[2]).received().len(), 2);
    // 第二段载荷不再触发 ARP，也不再洪泛
    assert_eq!(world.lan.stats.arp_requests, 1);
    assert_eq!(world.lan.stats.bridge_floods, 1);
    assert_eq!(world.lan.stats.bridge_forwards, 3);
}

fn host_mac(
    world: &mut LanWorld,
    hosts: &[crate::net::DeviceId],
    idx: usize,
) -> MacAddr {
    host_mut(&mut world.lan, hosts[idx])
        .interface("eth0")
        .expect("eth0 exists")
        .nic
        .mac()
}
