#![allow(unused_crate_dependencies)]
#![cfg(unix)]

mod common;

use common::{pid_from, Sandbox};
use predicates::prelude::*;

const PHONE: &str = "79990001122";

#[test]
fn missing_phone_exits_with_1_and_touches_nothing() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["launch", "acc.session", "12345", "hash"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("<PHONE>"));

    assert!(!sandbox.sessions().exists());
}

#[test]
fn empty_phone_exits_with_1_and_touches_nothing() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["launch", "acc.session", "12345", "hash", ""])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid argument"));

    assert!(!sandbox.sessions().exists());
}

#[test]
fn extra_positional_exits_with_1_and_touches_nothing() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["launch", "acc.session", "12345", "hash", PHONE, "extra"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unexpected argument"));

    assert!(!sandbox.sessions().exists());
}

#[test]
fn usage_errors_exit_with_1() {
    let sandbox = Sandbox::new();

    sandbox.cmd().arg("status").assert().code(1);
    sandbox.cmd().arg("stop").assert().code(1);
    sandbox.cmd().assert().code(1);
    sandbox
        .cmd()
        .args(["status", PHONE, "--no-such-flag"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--no-such-flag"));
}

#[test]
fn help_and_version_exit_with_0() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("launch"));
    sandbox.cmd().arg("--version").assert().success();
}

#[test]
fn unreachable_project_dir_exits_with_1_without_pid_file() {
    let sandbox = Sandbox::new();
    let missing = sandbox.root().join("missing-project");

    sandbox
        .cmd()
        .arg("--project-dir")
        .arg(&missing)
        .args(["launch", "acc.session", "12345", "hash", PHONE])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Environment error"));

    assert!(!sandbox.sessions().join(format!("{PHONE}.pid")).exists());
}

#[test]
fn launch_status_and_stop_round_trip() {
    let sandbox = Sandbox::new();

    let started = sandbox
        .cmd()
        .args(["launch", "acc.session", "12345", "hash", PHONE])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Started bot for {PHONE} with PID")));
    let pid = pid_from(&String::from_utf8_lossy(&started.get_output().stdout));

    let pid_file = sandbox.sessions().join(format!("{PHONE}.pid"));
    assert_eq!(std::fs::read_to_string(&pid_file).unwrap(), format!("{pid}\n"));

    sandbox
        .cmd()
        .args(["launch", "other.session", "1", "h", PHONE])
        .assert()
        .success()
        .stdout(format!("Bot for {PHONE} is already running (PID {pid})\n"));

    sandbox
        .cmd()
        .args(["status", PHONE])
        .assert()
        .success()
        .stdout(format!("{PHONE}: running (PID {pid})\n"));

    sandbox
        .cmd()
        .args(["stop", PHONE])
        .assert()
        .success()
        .stdout(format!("Stopped bot for {PHONE} (PID {pid})\n"));

    sandbox
        .cmd()
        .args(["status", PHONE, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status":{"state":"absent"}"#));
    assert!(!pid_file.exists());
}

#[test]
fn stale_record_is_reported_and_replaced() {
    let sandbox = Sandbox::new();
    std::fs::create_dir_all(sandbox.sessions()).unwrap();
    let stale = i32::MAX as u32;
    std::fs::write(sandbox.sessions().join(format!("{PHONE}.pid")), format!("{stale}\n"))
        .unwrap();

    sandbox
        .cmd()
        .args(["status", PHONE])
        .assert()
        .success()
        .stdout(format!("{PHONE}: stale (PID {stale} is not running)\n"));

    sandbox
        .cmd()
        .args(["launch", "acc.session", "12345", "hash", PHONE])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "Removed stale PID file for {PHONE} (PID {stale} is not running)"
        )))
        .stdout(predicate::str::contains("Started bot for"));

    sandbox.cmd().args(["stop", PHONE]).assert().success();
}

#[test]
fn spawn_failure_exits_with_1() {
    let sandbox = Sandbox::new();
    let config = std::fs::read_to_string(&sandbox.config_path)
        .unwrap()
        .replace("runner = '/bin/sh'", "runner = '/nonexistent/runner'");
    std::fs::write(&sandbox.config_path, config).unwrap();

    sandbox
        .cmd()
        .args(["launch", "acc.session", "12345", "hash", PHONE])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Spawn failure"));

    assert!(!sandbox.sessions().join(format!("{PHONE}.pid")).exists());
}
