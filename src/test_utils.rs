use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
    thread,
    time::{Duration, Instant},
};

use crate::{config::MiningConfig, controller::ControllerSettings};

/// Global lock for environment variable modifications in tests.
/// Tests that touch `HOME` or `ONYXD_HOME` should hold it so parallel tests
/// never observe each other's values.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Writes an executable shell script named `name` into `dir`. Names must be
/// unique per test because stop requests sweep processes by name.
pub fn fake_worker(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A configuration that passes validation.
pub fn valid_config() -> MiningConfig {
    MiningConfig {
        wallet_address: "44AFFq5kSiGBoZ4NMDwYtN18obc8AemS33DBLWs3H7otXft".into(),
        ..MiningConfig::default()
    }
}

/// Polls `condition` for up to five seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Controller settings with short timeouts for a fake worker at `binary`.
pub fn fast_settings(binary: PathBuf) -> ControllerSettings {
    ControllerSettings {
        worker_binary: binary,
        probe_timeout: Duration::from_secs(2),
        graceful_timeout: Duration::from_secs(2),
        forced_timeout: Duration::from_secs(1),
        quick_join_timeout: Duration::from_millis(500),
        monitor_join_timeout: Duration::from_secs(2),
        read_wait: Duration::from_millis(100),
        idle_sleep: Duration::from_millis(10),
    }
}
