//! 双主机共享介质仿真
//!
//! h1 → h2 发送一段载荷：先 ARP 解析再 IP 交付；
//! `--collide` 预置两端 ARP 并让 h2 在载波到达前抢发，制造 CSMA/CD 冲突。

use clap::Parser;
use lansim_rs::demo::{build_coax_pair, CoaxPair, CoaxPairOpts, SendPayload};
use lansim_rs::ip::host_mut;
use lansim_rs::net::LanWorld;
use lansim_rs::sim::{SimTime, Simulator};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "two_hosts",
    about = "双主机 10BASE5 共享介质仿真：ARP + IP 交付，可选制造冲突"
)]
struct Args {
    /// 仿真运行到的时刻（支持 ns/us/ms/s 后缀）
    #[arg(long, default_value = "50ms")]
    until: String,
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,
    #[arg(long, default_value_t = 4)]
    payload_bytes: usize,
    /// 预置 ARP 并让两端同时发包以制造冲突
    #[arg(long, default_value_t = false)]
    collide: bool,
    /// 把结构化轨迹写成 JSON 文件
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let until = match SimTime::parse(&args.until) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("invalid --until: {err}");
            std::process::exit(2);
        }
    };

    let mut sim = Simulator::default();
    let mut world = LanWorld::with_seed(args.seed);
    if args.trace_out.is_some() {
        world.lan.enable_trace();
    }
    let pair = build_coax_pair(&mut world, &CoaxPairOpts::default());

    let payload: Vec<u8> = (0..args.payload_bytes).map(|i| i as u8).collect();
    sim.schedule(
        SimTime::ZERO,
        SendPayload {
            host: pair.h1,
            ifc: "eth0".into(),
            dst: pair.h2_ip,
            payload: payload.clone(),
        },
    );
    if args.collide {
        seed_arp_both_ways(&mut world, &pair);
        // 传播时延约 1.26 µs，1 µs 后对向发包必然在载波到达前开始
        sim.schedule(
            SimTime(1_000),
            SendPayload {
                host: pair.h2,
                ifc: "eth0".into(),
                dst: pair.h1_ip,
                payload,
            },
        );
    }

    sim.run_until(until, &mut world);

    println!("done @ {}", sim.now());
    println!("stats: {:#?}", world.lan.stats);
    println!(
        "h1 received={} h2 received={}",
        host_mut(&mut world.lan, pair.h1).received().len(),
        host_mut(&mut world.lan, pair.h2).received().len()
    );

    if let Some(path) = args.trace_out {
        let json = world
            .lan
            .trace_logger()
            .expect("trace enabled")
            .to_json_string()
            .expect("serialize trace");
        std::fs::write(&path, json).expect("write trace file");
        println!("trace written to {}", path.display());
    }
}

fn seed_arp_both_ways(world: &mut LanWorld, pair: &CoaxPair) {
    host_mut(&mut world.lan, pair.h1)
        .seed_arp(SimTime::ZERO, "eth0", pair.h2_ip, pair.h2_mac)
        .expect("h1 eth0");
    host_mut(&mut world.lan, pair.h2)
        .seed_arp(SimTime::ZERO, "eth0", pair.h1_ip, pair.h1_mac)
        .expect("h2 eth0");
}
