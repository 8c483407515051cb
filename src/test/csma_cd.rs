use crate::demo::{build_coax_pair, CoaxPair, CoaxPairOpts, SendPayload};
use crate::ip::{host_mut, IpProtocol};
use crate::net::LanWorld;
use crate::sim::{SimTime, Simulator};

fn send(pair: &CoaxPair, from_h1: bool, payload: Vec<u8>) -> SendPayload {
    SendPayload {
        host: if from_h1 { pair.h1 } else { pair.h2 },
        ifc: "eth0".into(),
        dst: if from_h1 { pair.h2_ip } else { pair.h1_ip },
        payload,
    }
}

#[test]
fn arp_resolves_then_ip_payload_is_delivered() {
    let mut sim = Simulator::default();
    let mut world = LanWorld::with_seed(7);
    let pair = build_coax_pair(&mut world, &CoaxPairOpts::default());

    sim.schedule(SimTime::ZERO, send(&pair, true, vec![1, 2, 3, 4]));
    sim.run(&mut world);
    let now = sim.now();

    // 恰好一次请求、一次应答，载荷送达 h2
    assert_eq!(world.lan.stats.arp_requests, 1);
    assert_eq!(world.lan.stats.arp_replies, 1);
    assert_eq!(world.lan.stats.collisions, 0);
    assert_eq!(world.lan.stats.packets_delivered, 1);

    {
        let h2 = host_mut(&mut world.lan, pair.h2);
        let received = h2.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].data, vec![1, 2, 3, 4]);
        assert_eq!(received[0].protocol, IpProtocol::Tcp);
        assert_eq!(received[0].src, pair.h1_ip);
        // h2 从请求里学到 h1
        assert_eq!(
            h2.arp_lookup(now, "eth0", pair.h1_ip),
            Some(pair.h1_mac)
        );
    }
    // h1 从应答里学到 h2
    let h1 = host_mut(&mut world.lan, pair.h1);
    assert!(h1.received().is_empty());
    assert_eq!(h1.arp_lookup(now, "eth0", pair.h2_ip), Some(pair.h2_mac));
}

fn seed_arp_both_ways(world: &mut LanWorld, pair: &CoaxPair) {
    host_mut(&mut world.lan, pair.h1)
        .seed_arp(SimTime::ZERO, "eth0", pair.h2_ip, pair.h2_mac)
        .expect("h1 eth0");
    host_mut(&mut world.lan, pair.h2)
        .seed_arp(SimTime::ZERO, "eth0", pair.h1_ip, pair.h1_mac)
        .expect("h2 eth0");
}

#[test]
fn overlapping_transmissions_collide_then_both_deliver() {
    let mut sim = Simulator::default();
    let mut world = LanWorld::with_seed(11);
    let pair = build_coax_pair(&mut world, &CoaxPairOpts::default());
    seed_arp_both_ways(&mut world, &pair);

    // 传播时延约 1.26 µs > 1 µs：h2 在 h1 的载波到达前开始发送
    sim.schedule(SimTime::ZERO, send(&pair, true, vec![0xA1]));
    sim.schedule(SimTime(1_000), send(&pair, false, vec![0xB2]));
    sim.run(&mut world);

    // 两端都检测到冲突并阻塞介质
    assert!(world.lan.stats.collisions >= 2, "stats: {:?}", world.lan.stats);
    assert!(world.lan.stats.jams >= 2);
    assert!(world.lan.stats.backoffs >= 2);
    assert_eq!(world.lan.stats.transmissions_aborted, 0);

    // 退避后两帧都成功送达
    assert_eq!(host_mut(&mut world.lan, pair.h2).received().len(), 1);
    assert_eq!(host_mut(&mut world.lan, pair.h1).received().len(), 1);
    assert_eq!(
        host_mut(&mut world.lan, pair.h2).received()[0].data,
        vec![0xA1]
    );
    assert_eq!(
        host_mut(&mut world.lan, pair.h1).received()[0].data,
        vec![0xB2]
    );
}

fn collision_trace(seed: u64) -> String {
    let mut sim = Simulator::default();
    let mut world = LanWorld::with_seed(seed);
    world.lan.enable_trace();
    let pair = build_coax_pair(&mut world, &CoaxPairOpts::default());
    seed_arp_both_ways(&mut world, &pair);

    sim.schedule(SimTime::ZERO, send(&pair, true, vec![1, 2, 3]));
    sim.schedule(SimTime(1_000), send(&pair, false, vec![4, 5, 6]));
    sim.run(&mut world);

    let logger = world.lan.trace_logger().expect("trace enabled");
    // 轨迹时间单调不减
    assert!(logger
        .events
        .windows(2)
        .all(|w| w[0].t_ns <= w[1].t_ns));
    logger.to_json_string().expect("serialize trace")
}

#[test]
fn identical_seeds_reproduce_identical_event_traces() {
    assert_eq!(collision_trace(42), collision_trace(42));
}
