//! 星型网桥学习仿真
//!
//! 三个站点经 10BASE5 粗缆接到四口网桥；h1 向 h3 连发两段载荷，
//! 观察首帧洪泛、转发表学习与后续单播定向转发。

use clap::Parser;
use lansim_rs::demo::{build_bridged_star, BridgedStarOpts, SendPayload};
use lansim_rs::ip::host_mut;
use lansim_rs::net::{bridge_mut, LanWorld};
use lansim_rs::sim::{SimTime, Simulator};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bridge_lan", about = "星型网桥学习仿真：洪泛 → 学习 → 定向转发")]
struct Args {
    /// 仿真运行到的时刻（支持 ns/us/ms/s 后缀）
    #[arg(long, default_value = "50ms")]
    until: String,
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,
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
    let star = build_bridged_star(&mut world, &BridgedStarOpts::default());

    // h1 → h3：第一帧（ARP 广播）洪泛，应答后单播只走学到的端口
    sim.schedule(
        SimTime::ZERO,
        SendPayload {
            host: star.hosts[0],
            ifc: "eth0".into(),
            dst: star.host_ips[2],
            payload: vec![1, 2, 3, 4],
        },
    );
    sim.schedule(
        SimTime::from_millis(20),
        SendPayload {
            host: star.hosts[0],
            ifc: "eth0".into(),
            dst: star.host_ips[2],
            payload: vec![5, 6, 7, 8],
        },
    );

    sim.run_until(until, &mut world);

    println!("done @ {}", sim.now());
    println!("stats: {:#?}", world.lan.stats);
    let mut entries: Vec<String> = bridge_mut(&mut world.lan, star.bridge)
        .forward_table()
        .iter()
        .map(|(mac, port)| format!("{mac} -> port{}", port.0))
        .collect();
    entries.sort();
    println!("forward table:");
    for line in entries {
        println!("  {line}");
    }
    println!(
        "h3 received={}",
        host_mut(&mut world.lan, star.hosts[2]).received().len()
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
