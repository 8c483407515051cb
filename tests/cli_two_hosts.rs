use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "lansim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn two_hosts_delivers_and_writes_trace_json() {
    let dir = unique_temp_dir("two-hosts");
    let trace_path = dir.join("trace.json");

    let output = Command::new(env!("CARGO_BIN_EXE_two_hosts"))
        .args([
            "--until",
            "100ms",
            "--trace-out",
            trace_path.to_str().expect("utf8 path"),
        ])
        .output()
        .expect("run two_hosts");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("done @"), "stdout: {stdout}");
    assert!(stdout.contains("h2 received=1"), "stdout: {stdout}");

    let trace: Value =
        serde_json::from_str(&fs::read_to_string(&trace_path).expect("read trace file"))
            .expect("trace parses as json");
    let events = trace.as_array().expect("trace is an array");
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.get("t_ns").is_some() && e.get("kind").is_some()));
}

#[test]
fn two_hosts_collide_flag_reports_collisions() {
    let output = Command::new(env!("CARGO_BIN_EXE_two_hosts"))
        .args(["--until", "200ms", "--collide"])
        .output()
        .expect("run two_hosts");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("h1 received=1"), "stdout: {stdout}");
    assert!(stdout.contains("h2 received=1"), "stdout: {stdout}");
}

#[test]
fn two_hosts_rejects_bad_time_token() {
    let output = Command::new(env!("CARGO_BIN_EXE_two_hosts"))
        .args(["--until", "5fortnights"])
        .output()
        .expect("run two_hosts");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn bridge_lan_learns_and_prints_forward_table() {
    let output = Command::new(env!("CARGO_BIN_EXE_bridge_lan"))
        .args(["--until", "100ms"])
        .output()
        .expect("run bridge_lan");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("forward table:"), "stdout: {stdout}");
    assert!(stdout.contains("h3 received=2"), "stdout: {stdout}");
}
