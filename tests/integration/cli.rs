#[path = "common/mod.rs"]
mod common;

use assert_cmd::Command;
use common::{DaemonProcess, mining_worker, onyxd_bin, write_valid_config};
use predicates::prelude::*;
use tempfile::tempdir;

fn onyxd(home: &std::path::Path) -> Command {
    let mut cmd = Command::new(onyxd_bin());
    cmd.arg("--home").arg(home);
    cmd
}

#[test]
fn client_commands_fail_without_daemon() {
    let temp = tempdir().expect("failed to create tempdir");

    onyxd(temp.path())
        .arg("ping")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotAvailable"));
}

#[test]
fn ping_and_status_print_json() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "cli-status-worker");
    let _daemon = DaemonProcess::spawn(temp.path(), &worker);

    onyxd(temp.path())
        .arg("ping")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""message": "pong""#))
        .stdout(predicate::str::contains(r#""version": "1.0.0""#));

    onyxd(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""mode": "stopped""#));
}

#[test]
fn rejected_request_exits_non_zero() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "cli-reject-worker");
    let _daemon = DaemonProcess::spawn(temp.path(), &worker);

    onyxd(temp.path())
        .args(["start", "turbo"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid mode: turbo"));
}

#[test]
fn config_set_and_show_round_trip() {
    let temp = tempdir().expect("failed to create tempdir");
    write_valid_config(temp.path());
    let worker = mining_worker(temp.path(), "cli-config-worker");
    let _daemon = DaemonProcess::spawn(temp.path(), &worker);

    onyxd(temp.path())
        .args(["config", "set", "--worker", "rig-42", "--tls", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration updated"));

    onyxd(temp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""worker_name": "rig-42""#)
                .and(predicate::str::contains(r#""use_ssl": false"#)),
        );

    onyxd(temp.path())
        .args(["config", "set", "--pool", "no-port"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Pool URL must include port"));
}

#[test]
fn config_set_without_fields_is_a_usage_error() {
    let temp = tempdir().expect("failed to create tempdir");

    onyxd(temp.path())
        .args(["config", "set"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one field"));
}

#[test]
fn second_daemon_refuses_to_start() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "cli-twice-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    onyxd(temp.path())
        .args(["daemon", "--worker-bin"])
        .arg(&worker)
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .failure()
        .stderr(predicate::str::contains(format!(
            "already running with PID {}",
            daemon.pid()
        )));
}
