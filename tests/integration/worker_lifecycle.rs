#[path = "common/mod.rs"]
mod common;

use common::{
    DaemonProcess, fake_worker, is_process_alive, mining_worker, wait_for, write_valid_config,
};
use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use onyxd::{protocol::Request, runtime::RuntimePaths};
use serde_json::json;
use tempfile::tempdir;

fn start(daemon: &DaemonProcess, mode: &str) -> onyxd::protocol::Response {
    daemon.request(&Request::Start { mode: mode.into() })
}

fn worker_pid(daemon: &DaemonProcess) -> Option<u32> {
    daemon
        .request(&Request::Status)
        .get("pid")
        .and_then(|pid| pid.as_u64())
        .map(|pid| pid as u32)
}

#[test]
fn start_background_is_acknowledged_then_running() {
    let temp = tempdir().expect("failed to create tempdir");
    write_valid_config(temp.path());
    let worker = mining_worker(temp.path(), "life-start-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    let reply = start(&daemon, "background");
    assert!(reply.ok);
    assert_eq!(reply.message_text(), Some("Starting background mining..."));

    assert!(wait_for(|| {
        let status = daemon.request(&Request::Status);
        status.get("mode") == Some(&json!("background"))
            && status.get("threads_active").and_then(|t| t.as_u64()) > Some(0)
    }));
    assert!(RuntimePaths::new(temp.path()).worker_config_file().exists());

    assert!(wait_for(|| {
        daemon.request(&Request::Status).get("hashrate") == Some(&json!("512.0 H/s"))
    }));

    // Still mining well after the request that started it has completed.
    std::thread::sleep(std::time::Duration::from_millis(1500));
    let status = daemon.request(&Request::Status);
    assert_eq!(status.get("mode"), Some(&json!("background")));
    assert!(is_process_alive(worker_pid(&daemon).expect("worker pid")));

    let logs = daemon.request(&Request::Logs { lines: 50 });
    let tail = logs.get("status").unwrap()["log_tail"].as_array().unwrap().clone();
    assert!(
        tail.iter()
            .any(|line| line.as_str().unwrap().contains("Mining started: background"))
    );

    let stopped = daemon.request(&Request::Stop);
    assert_eq!(stopped.message_text(), Some("Mining stopped"));
    assert_eq!(
        daemon.request(&Request::Status).get("mode"),
        Some(&json!("stopped"))
    );
    assert!(!RuntimePaths::new(temp.path()).worker_config_file().exists());
}

#[test]
fn bogus_mode_changes_nothing() {
    let temp = tempdir().expect("failed to create tempdir");
    write_valid_config(temp.path());
    let worker = mining_worker(temp.path(), "life-bogus-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    let reply = start(&daemon, "bogus");
    assert!(!reply.ok);
    assert!(reply.error.unwrap().starts_with("Invalid mode: bogus"));
    assert_eq!(
        daemon.request(&Request::Status).get("mode"),
        Some(&json!("stopped"))
    );
}

#[test]
fn start_without_wallet_reports_configuration_error() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "life-nowallet-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    let reply = start(&daemon, "background");
    assert!(!reply.ok);
    assert_eq!(
        reply.error.as_deref(),
        Some("Configuration error: Wallet address must be configured")
    );
}

#[test]
fn externally_killed_worker_is_reconciled_to_stopped() {
    let temp = tempdir().expect("failed to create tempdir");
    write_valid_config(temp.path());
    let worker = mining_worker(temp.path(), "life-killed-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    start(&daemon, "high_intensity");
    assert!(wait_for(|| worker_pid(&daemon).is_some()));
    let pid = worker_pid(&daemon).unwrap();

    signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL).expect("failed to kill worker");

    assert!(wait_for(|| {
        daemon.request(&Request::Status).get("mode") == Some(&json!("stopped"))
    }));
    let status = daemon.request(&Request::Status);
    assert!(
        status
            .get("last_error")
            .and_then(|e| e.as_str())
            .unwrap()
            .contains("terminated unexpectedly")
    );
}

#[test]
fn mode_switch_replaces_the_worker() {
    let temp = tempdir().expect("failed to create tempdir");
    write_valid_config(temp.path());
    let worker = mining_worker(temp.path(), "life-switch-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    start(&daemon, "background");
    assert!(wait_for(|| worker_pid(&daemon).is_some()));
    let first = worker_pid(&daemon).unwrap();

    start(&daemon, "money_hunter");
    assert!(wait_for(|| {
        daemon.request(&Request::Status).get("mode") == Some(&json!("high_intensity"))
    }));
    let second = worker_pid(&daemon).unwrap();
    assert_ne!(first, second);
    assert!(wait_for(|| !is_process_alive(first)));

    daemon.request(&Request::Stop);
}

#[test]
fn daemon_shutdown_stops_running_worker() {
    let temp = tempdir().expect("failed to create tempdir");
    write_valid_config(temp.path());
    let worker = mining_worker(temp.path(), "life-shutdown-worker");
    let mut daemon = DaemonProcess::spawn(temp.path(), &worker);

    start(&daemon, "background");
    assert!(wait_for(|| worker_pid(&daemon).is_some()));
    let pid = worker_pid(&daemon).unwrap();

    assert_eq!(daemon.terminate(), Some(0));
    assert!(wait_for(|| !is_process_alive(pid)));
}

#[test]
fn missing_worker_binary_is_reported_in_status() {
    let temp = tempdir().expect("failed to create tempdir");
    write_valid_config(temp.path());
    let missing = temp.path().join("not-installed-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &missing);

    let status = daemon.request(&Request::Status);
    assert!(
        status
            .get("last_error")
            .and_then(|e| e.as_str())
            .unwrap()
            .starts_with("Worker binary not available")
    );

    // The acknowledgement is immediate; the launch failure lands in state.
    assert!(start(&daemon, "background").ok);
    assert!(wait_for(|| {
        daemon
            .request(&Request::Status)
            .get("last_error")
            .and_then(|e| e.as_str())
            .is_some_and(|e| e.starts_with("Failed to start worker"))
    }));
    assert_eq!(
        daemon.request(&Request::Status).get("mode"),
        Some(&json!("stopped"))
    );
}

#[test]
fn failing_probe_does_not_stop_the_daemon() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = fake_worker(temp.path(), "life-probe-worker", "exit 3");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    assert!(daemon.request(&Request::Ping).ok);
}
