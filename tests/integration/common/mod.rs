#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use onyxd::{
    config::{ConfigStore, MiningConfig},
    ipc,
    protocol::{Request, Response},
    runtime::RuntimePaths,
};
use serde_json::Value;

pub const WALLET: &str = "44AFFq5kSiGBoZ4NMDwYtN18obc8AemS33DBLWs3H7otXft";

pub fn onyxd_bin() -> &'static str {
    env!("CARGO_BIN_EXE_onyxd")
}

/// Writes an executable shell script acting as the mining worker. Every test
/// needs its own name because stop requests sweep workers by name.
pub fn fake_worker(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write fake worker");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("failed to mark fake worker executable");
    path
}

/// A worker that answers the version probe and otherwise prints a hashrate
/// line and sleeps.
pub fn mining_worker(dir: &Path, name: &str) -> PathBuf {
    fake_worker(
        dir,
        name,
        r#"if [ "$1" = "--version" ]; then echo "FakeRig 6.21.0"; exit 0; fi
echo "[cpu] speed 10s/60s/15m 498.0 505.5 512.0 H/s max 520.0 H/s"
exec sleep 60"#,
    )
}

pub fn write_valid_config(home: &Path) {
    ConfigStore::new(RuntimePaths::new(home))
        .save(&MiningConfig {
            wallet_address: WALLET.into(),
            ..MiningConfig::default()
        })
        .expect("failed to save config");
}

/// A daemon running as a child process; SIGTERM and reap on drop.
pub struct DaemonProcess {
    child: Child,
    pub home: PathBuf,
}

impl DaemonProcess {
    pub fn spawn(home: &Path, worker: &Path) -> Self {
        let child = Command::new(onyxd_bin())
            .arg("daemon")
            .arg("--home")
            .arg(home)
            .arg("--worker-bin")
            .arg(worker)
            .arg("--log-level")
            .arg("debug")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn onyxd daemon");

        let daemon = Self {
            child,
            home: home.to_path_buf(),
        };
        daemon.wait_until_ready();
        daemon
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn socket(&self) -> PathBuf {
        RuntimePaths::new(&self.home).socket()
    }

    pub fn request(&self, request: &Request) -> Response {
        ipc::send_request(&self.socket(), request, Duration::from_secs(10))
            .expect("request to daemon failed")
    }

    /// Sends raw bytes and returns the raw reply.
    pub fn raw(&self, payload: &[u8]) -> Value {
        use std::{io::Write, os::unix::net::UnixStream};

        let mut stream = UnixStream::connect(self.socket()).expect("failed to connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("failed to set timeout");
        stream.write_all(payload).expect("failed to send payload");
        let reply = ipc::read_message(&mut stream).expect("failed to read reply");
        serde_json::from_slice(&reply).expect("reply was not JSON")
    }

    fn wait_until_ready(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if ipc::send_request(&self.socket(), &Request::Ping, Duration::from_secs(1)).is_ok() {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
        panic!("daemon did not become ready at {:?}", self.socket());
    }

    /// Sends SIGTERM and waits for the daemon to exit.
    pub fn terminate(&mut self) -> Option<i32> {
        let _ = signal::kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM);
        let deadline = Instant::now() + Duration::from_secs(15);
        while Instant::now() < deadline {
            if let Ok(Some(status)) = self.child.try_wait() {
                return status.code();
            }
            thread::sleep(Duration::from_millis(50));
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
        None
    }
}

impl Drop for DaemonProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            self.terminate();
        }
    }
}

pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}

pub fn is_process_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}
