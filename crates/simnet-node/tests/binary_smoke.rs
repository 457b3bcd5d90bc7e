//! Smoke tests for the `simnet-node` binary.

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};

const CONFIG: &[u8] = br#"
[node]
name = "smoke"

[[interfaces]]
name = "eth0"
address = "10.0.0.1"
prefix_len = 24

[[interfaces]]
name = "eth1"
address = "10.1.0.1"
prefix_len = 24
mtu = 576

[[routes]]
destination = "192.168.0.0/16"
gateway = "10.1.0.254"
interface = "eth1"
"#;

const SCENARIO: &[u8] = br#"
[[events]]
at_ms = 0
kind = "receive"
interface = "eth0"
source = "10.0.0.9"
destination = "192.168.4.4"
payload_len = 1000

[[events]]
at_ms = 5
kind = "send"
destination = "10.0.0.1"
payload = "ping"
"#;

fn temp_file(content: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file
}

#[test]
fn binary_replays_scenario() {
    let bin = env!("CARGO_BIN_EXE_simnet-node");
    let config_file = temp_file(CONFIG);
    let scenario_file = temp_file(SCENARIO);

    // tracing_subscriber writes to stdout by default
    let stdout_file = tempfile::NamedTempFile::new().unwrap();
    let stdout_writer = stdout_file.reopen().unwrap();

    let status = Command::new(bin)
        .args([
            "--config",
            config_file.path().to_str().unwrap(),
            "--scenario",
            scenario_file.path().to_str().unwrap(),
        ])
        .env("RUST_LOG_FORMAT", "json")
        .env("RUST_LOG", "info")
        .stdout(Stdio::from(stdout_writer))
        .stderr(Stdio::null())
        .status()
        .expect("failed to run simnet-node");

    assert!(
        status.success(),
        "expected exit code 0, got {:?}",
        status.code()
    );

    let stdout_content = std::fs::read_to_string(stdout_file.path()).unwrap();
    let lines: Vec<String> = BufReader::new(stdout_content.as_bytes())
        .lines()
        .map_while(Result::ok)
        .collect();

    assert!(
        lines.iter().any(|l| l.starts_with('{')),
        "expected at least one JSON log line, got: {stdout_content}"
    );
    assert!(
        lines.iter().any(|l| l.contains("scenario complete")),
        "got: {stdout_content}"
    );
    assert!(
        lines
            .iter()
            .any(|l| l == "smoke: forwarded 1, delivered 1, dropped 0, unroutable 0, multicast 0"),
        "got: {stdout_content}"
    );
}

#[test]
fn binary_rejects_bad_config() {
    let bin = env!("CARGO_BIN_EXE_simnet-node");
    let config_file = temp_file(b"[[interfaces]]\nname = \"eth0\"\n");

    let output = Command::new(bin)
        .args(["--config", config_file.path().to_str().unwrap()])
        .output()
        .expect("failed to run simnet-node");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn binary_reports_missing_config() {
    let bin = env!("CARGO_BIN_EXE_simnet-node");

    let output = Command::new(bin)
        .args(["--config", "/nonexistent/simnet.toml"])
        .output()
        .expect("failed to run simnet-node");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load config"), "got: {stderr}");
}
