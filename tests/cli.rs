//! Integration tests for top-level CLI behavior.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};

const ISOLATED: [&str; 2] = ["CHAINTASK_RECORD", "CHAINTASK_REPLAY"];

fn chaintask() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chaintask"));
    for var in ISOLATED {
        cmd.env_remove(var);
    }
    cmd
}

fn run_chaintask(args: &[&str]) -> Output {
    chaintask().args(args).output().expect("failed to run chaintask binary")
}

fn write_cassette(dir: &Path, port: &str, calls: &[(&str, Value)]) {
    let interactions: Vec<Value> = calls
        .iter()
        .enumerate()
        .map(|(seq, (method, output))| {
            json!({ "seq": seq, "port": port, "method": method, "input": null, "output": output })
        })
        .collect();
    let cassette = json!({
        "name": format!("cli-{port}"),
        "recorded_at": "2025-01-01T00:00:00Z",
        "store": "0xd9fc6cC979472A5FA52750ae26805462E1638872",
        "interactions": interactions,
    });
    let yaml = serde_yaml::to_string(&cassette).expect("serialize cassette");
    std::fs::write(dir.join(format!("{port}.cassette.yaml")), yaml).expect("write cassette");
}

#[test]
fn help_lists_the_task_commands() {
    let output = run_chaintask(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    for command in ["list", "add", "delete"] {
        assert!(stdout.contains(command), "help is missing {command}: {stdout}");
    }
}

#[test]
fn add_without_arguments_shows_error() {
    let output = run_chaintask(&["add"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("TITLE") || stderr.contains("required"));
}

#[test]
fn delete_requires_a_numeric_id() {
    let output = run_chaintask(&["delete", "seven"]);
    assert!(!output.status.success());
}

#[test]
fn unknown_subcommand_fails() {
    let output = run_chaintask(&["frobnicate"]);
    assert!(!output.status.success());
}

#[test]
fn invalid_store_address_is_a_configuration_error() {
    let output = chaintask()
        .args(["list"])
        .env("CHAINTASK_STORE_ADDRESS", "not-an-address")
        .output()
        .expect("failed to run chaintask binary");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("Configuration error"), "stderr: {stderr}");
}

#[test]
fn unreachable_node_is_a_read_failure() {
    let output = chaintask()
        .args(["list"])
        .env("CHAINTASK_RPC_URL", "http://127.0.0.1:9")
        .output()
        .expect("failed to run chaintask binary");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("Ledger read failed"), "stderr: {stderr}");
}

#[test]
fn add_replays_a_recorded_session() {
    let dir = std::env::temp_dir().join(format!("chaintask_cli_replay_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create session dir");

    let stored = json!([{ "id": 7, "title": "Buy milk", "body": "2%", "deleted": false }]);
    write_cassette(
        &dir,
        "ledger",
        &[
            ("list_items", json!({ "Ok": [] })),
            ("submit_create", json!({ "Ok": "0xabc" })),
            ("receipt", json!({ "Ok": "Confirmed" })),
            ("list_items", json!({ "Ok": stored })),
        ],
    );
    write_cassette(
        &dir,
        "accounts",
        &[("authorized_accounts", json!({ "Ok": [] })), ("request_accounts", json!({ "Ok": "0xaaa" }))],
    );
    write_cassette(&dir, "id_gen", &[("generate_id", json!("key-1"))]);
    write_cassette(&dir, "clock", &[("now", json!("2025-01-01T00:00:00Z"))]);

    let output = chaintask()
        .args(["add", "Buy milk", "2%", "--quiet"])
        .env("CHAINTASK_REPLAY", &dir)
        .output()
        .expect("failed to run chaintask binary");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("#7        Buy milk - 2%"), "stdout: {stdout}");
    assert!(stdout.contains("Added task #7."), "stdout: {stdout}");

    let _ = std::fs::remove_dir_all(&dir);
}
