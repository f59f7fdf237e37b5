//! Runtime paths for the daemon's state directory.
use std::{
    env, fs,
    os::unix::fs::{DirBuilderExt, PermissionsExt},
    path::{Path, PathBuf},
};

use crate::{
    constants::{
        CONFIG_FILE_NAME, DAEMON_LOG_FILE_NAME, HOME_OVERRIDE_ENV, PID_FILE_NAME,
        PRIVATE_DIR_MODE, SOCKET_FILE_NAME, STATE_DIR_NAME, WORKER_CONFIG_FILE_NAME,
        WORKER_LOG_FILE_NAME,
    },
    error::DaemonError,
};

/// Locations of every artifact the daemon reads or writes.
///
/// Built once at startup and handed to the components that need it; nothing in
/// the crate consults a global context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    base_dir: PathBuf,
}

impl RuntimePaths {
    /// Roots all artifacts in `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolves the state directory: explicit override, then `ONYXD_HOME`, then
    /// `$HOME/.onyx_monero`.
    pub fn resolve(override_dir: Option<&Path>) -> Self {
        if let Some(dir) = override_dir {
            return Self::new(dir);
        }
        if let Some(dir) = env::var_os(HOME_OVERRIDE_ENV).filter(|v| !v.is_empty()) {
            return Self::new(PathBuf::from(dir));
        }
        let home = env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self::new(home.join(STATE_DIR_NAME))
    }

    /// Creates the state directory with owner-only permissions.
    pub fn ensure_dirs(&self) -> Result<(), DaemonError> {
        let to_err = |source| DaemonError::RuntimeDir {
            path: self.base_dir.clone(),
            source,
        };
        fs::DirBuilder::new()
            .recursive(true)
            .mode(PRIVATE_DIR_MODE)
            .create(&self.base_dir)
            .map_err(to_err)?;
        fs::set_permissions(&self.base_dir, fs::Permissions::from_mode(PRIVATE_DIR_MODE))
            .map_err(to_err)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    pub fn worker_config_file(&self) -> PathBuf {
        self.base_dir.join(WORKER_CONFIG_FILE_NAME)
    }

    pub fn worker_log_file(&self) -> PathBuf {
        self.base_dir.join(WORKER_LOG_FILE_NAME)
    }

    /// Unix socket the command server listens on.
    pub fn socket(&self) -> PathBuf {
        self.base_dir.join(SOCKET_FILE_NAME)
    }

    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join(PID_FILE_NAME)
    }

    pub fn daemon_log_file(&self) -> PathBuf {
        self.base_dir.join(DAEMON_LOG_FILE_NAME)
    }
}
