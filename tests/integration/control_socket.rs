#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::{DaemonProcess, mining_worker, write_valid_config};
use onyxd::{config::ConfigPatch, protocol::Request, runtime::RuntimePaths};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn ping_returns_pong_and_version() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "sock-ping-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    let reply = daemon.raw(br#"{"cmd":"ping"}"#);
    assert_eq!(
        reply,
        json!({"ok": true, "message": "pong", "version": "1.0.0"})
    );
}

#[test]
fn bad_requests_do_not_affect_later_connections() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "sock-bad-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    let reply = daemon.raw(b"this is not json\n");
    assert_eq!(reply["ok"], false);
    assert!(reply["error"].as_str().unwrap().starts_with("Invalid JSON"));

    let reply = daemon.raw(br#"{"mode":"background"}"#);
    assert_eq!(reply["error"], "Missing 'cmd' field");

    let reply = daemon.raw(br#"{"cmd":"self_destruct"}"#);
    assert_eq!(reply["error"], "Unknown command: self_destruct");

    let pong = daemon.request(&Request::Ping);
    assert!(pong.ok);
}

#[test]
fn status_reports_idle_daemon() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "sock-idle-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    let status = daemon.request(&Request::Status);
    assert!(status.ok);
    assert_eq!(status.get("mode"), Some(&json!("stopped")));
    assert_eq!(status.get("is_active"), Some(&json!(false)));
    assert!(status.get("total_threads").unwrap().as_u64().unwrap() >= 1);
}

#[test]
fn invalid_config_set_is_rejected_and_not_persisted() {
    let temp = tempdir().expect("failed to create tempdir");
    write_valid_config(temp.path());
    let worker = mining_worker(temp.path(), "sock-config-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    let config_file = RuntimePaths::new(temp.path()).config_file();
    let before = fs::read_to_string(&config_file).expect("config should exist");

    let reply = daemon.request(&Request::ConfigSet(ConfigPatch {
        wallet_address: Some(String::new()),
        ..ConfigPatch::default()
    }));
    assert!(!reply.ok);
    assert_eq!(
        reply.error.as_deref(),
        Some("Invalid configuration: Wallet address must be configured")
    );
    assert_eq!(fs::read_to_string(&config_file).unwrap(), before);

    let reply = daemon.request(&Request::ConfigSet(ConfigPatch {
        profile_name: Some("Night shift".into()),
        ..ConfigPatch::default()
    }));
    assert_eq!(reply.message_text(), Some("Configuration updated"));
    let config = daemon.request(&Request::ConfigGet);
    assert_eq!(config.get("config").unwrap()["profile_name"], "Night shift");
}

#[test]
fn system_info_is_best_effort() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "sock-sysinfo-worker");
    let daemon = DaemonProcess::spawn(temp.path(), &worker);

    let info = daemon.request(&Request::SystemInfo);
    assert!(info.ok);
    assert!(info.get("cpu").unwrap()["logical_cores"].as_u64().unwrap() >= 1);
    assert!(info.get("memory").unwrap().is_object());
    assert!(info.get("thermal").unwrap().is_object());
}

#[test]
fn shutdown_removes_socket_and_pid_file() {
    let temp = tempdir().expect("failed to create tempdir");
    let worker = mining_worker(temp.path(), "sock-shutdown-worker");
    let mut daemon = DaemonProcess::spawn(temp.path(), &worker);
    let paths = RuntimePaths::new(temp.path());
    assert!(paths.pid_file().exists());

    assert_eq!(daemon.terminate(), Some(0));
    assert!(!paths.socket().exists());
    assert!(!paths.pid_file().exists());
}
