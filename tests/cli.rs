//! Tests for the procrun binary

#![cfg(unix)]

use std::time::{Duration, Instant};

use assert_cmd::Command;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use predicates::prelude::*;

fn procrun() -> Command {
    let mut cmd = Command::cargo_bin("procrun").expect("binary built");
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_run_echo() {
    procrun()
        .args(["run", "--", "echo", "hello"])
        .assert()
        .success()
        .stdout("hello\n");
}

#[test]
fn test_run_propagates_exit_code() {
    procrun()
        .args(["run", "--shell", "echo oops >&2; exit 3"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("oops"));
}

#[test]
fn test_run_timeout_exit_code() {
    procrun()
        .args(["run", "-t", "0.2", "--", "sleep", "10"])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .code(124)
        .stderr(predicate::str::contains("timed out"));
}

#[test]
fn test_run_missing_binary() {
    procrun()
        .args(["run", "--", "nonexistent_command_12345"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to spawn command"))
        .stderr(predicate::str::contains("hint"));
}

#[test]
fn test_run_json_summary() {
    procrun()
        .args(["run", "-f", "json", "echo 'hi there'"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"exit_code\": 0"))
        .stdout(predicate::str::contains("\"stdout\": \"hi there\""));
}

#[test]
fn test_watch_streams_output() {
    procrun()
        .args(["watch", "-i", "20", "--shell", "echo a; sleep 0.2; echo b"])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout("a\nb\n");
}

#[test]
fn test_config_json() {
    procrun()
        .args(["config", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("poll_interval_ms"));
}

#[test]
fn test_config_env_override() {
    procrun()
        .env("PROCRUN_DEFAULTS__POLL_INTERVAL_MS", "250")
        .args(["config", "-f", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("poll_interval_ms = 250"));
}

#[test]
fn test_interrupt_during_run_kills_child() {
    let dir = tempfile::TempDir::new().unwrap();
    let pid_file = dir.path().join("child.pid");
    let script = format!("echo $$ > {}; exec sleep 30", pid_file.display());

    let mut runner = std::process::Command::new(assert_cmd::cargo::cargo_bin("procrun"))
        .env("RUST_LOG", "off")
        .args(["run", "--shell", &script])
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let child: u32 = loop {
        if let Some(pid) = std::fs::read_to_string(&pid_file)
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            break pid;
        }
        assert!(Instant::now() < deadline, "child never started");
        std::thread::sleep(Duration::from_millis(20));
    };

    kill(Pid::from_raw(runner.id() as i32), Signal::SIGINT).unwrap();
    let status = runner.wait().unwrap();
    assert_eq!(status.code(), Some(130));

    let deadline = Instant::now() + Duration::from_secs(5);
    while ::procrun::process::is_alive(child) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(!::procrun::process::is_alive(child));
}
