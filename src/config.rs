//! Mining configuration and the worker configuration artifact.
use std::{
    fs::{self, OpenOptions},
    io::Write,
    os::unix::fs::{OpenOptionsExt, PermissionsExt},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    constants::PRIVATE_FILE_MODE, error::ConfigError, runtime::RuntimePaths,
    state::Priority,
};

/// Wallet value shipped in the default config; never accepted as valid.
pub const PLACEHOLDER_WALLET: &str = "YOUR_WALLET_ADDRESS_HERE";

/// Wallet, pool and worker settings for a mining session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Payout address.
    pub wallet_address: String,
    /// Pool endpoint as `host:port`.
    pub pool_url: String,
    /// Worker name reported to the pool.
    pub worker_name: String,
    /// Whether the pool connection uses TLS.
    pub use_ssl: bool,
    /// Human-readable profile label.
    pub profile_name: String,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            wallet_address: PLACEHOLDER_WALLET.to_string(),
            pool_url: "pool.supportxmr.com:443".to_string(),
            worker_name: "onyx-miner".to_string(),
            use_ssl: true,
            profile_name: "Default Profile".to_string(),
        }
    }
}

impl MiningConfig {
    /// Checks the validity predicate, returning the first failing reason.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wallet = self.wallet_address.trim();
        if wallet.is_empty() || wallet == PLACEHOLDER_WALLET {
            return Err(ConfigError::Invalid(
                "Wallet address must be configured".into(),
            ));
        }

        let pool = self.pool_url.trim();
        if pool.is_empty() {
            return Err(ConfigError::Invalid("Pool URL is required".into()));
        }
        if !pool.contains(':') {
            return Err(ConfigError::Invalid(
                "Pool URL must include port (e.g., pool.example.com:443)".into(),
            ));
        }

        if self.worker_name.trim().is_empty() {
            return Err(ConfigError::Invalid("Worker name is required".into()));
        }

        Ok(())
    }

    /// Tuple form of [`MiningConfig::validate`]; the reason is empty when valid.
    pub fn is_valid(&self) -> (bool, String) {
        match self.validate() {
            Ok(()) => (true, String::new()),
            Err(err) => (false, err.to_string()),
        }
    }

    /// Returns a copy with every field present in `patch` overwritten.
    pub fn merged(&self, patch: &ConfigPatch) -> Self {
        let mut merged = self.clone();
        if let Some(wallet) = &patch.wallet_address {
            merged.wallet_address = wallet.clone();
        }
        if let Some(pool) = &patch.pool_url {
            merged.pool_url = pool.clone();
        }
        if let Some(worker) = &patch.worker_name {
            merged.worker_name = worker.clone();
        }
        if let Some(use_ssl) = patch.use_ssl {
            merged.use_ssl = use_ssl;
        }
        if let Some(profile) = &patch.profile_name {
            merged.profile_name = profile.clone();
        }
        merged
    }
}

/// Partial update of a [`MiningConfig`]; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Loads, saves and derives worker configuration from the persisted settings.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    paths: RuntimePaths,
}

impl ConfigStore {
    pub fn new(paths: RuntimePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    /// Loads the persisted config, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(&self) -> MiningConfig {
        let path = self.paths.config_file();
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return MiningConfig::default();
        }

        match read_config(&path) {
            Ok(config) => {
                debug!("Loaded configuration: {}", config.profile_name);
                config
            }
            Err(err) => {
                warn!("Failed to load config {:?}: {err}; using defaults", path);
                MiningConfig::default()
            }
        }
    }

    /// Validates and persists `config`. Invalid configs never reach disk.
    pub fn save(&self, config: &MiningConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.write(config)?;
        info!("Configuration saved: {}", config.profile_name);
        Ok(())
    }

    /// Writes the default config when none exists yet and returns the
    /// effective configuration.
    pub fn create_default_if_missing(&self) -> Result<MiningConfig, ConfigError> {
        if !self.paths.config_file().exists() {
            self.write(&MiningConfig::default())?;
            info!(
                "Created default configuration at {:?}",
                self.paths.config_file()
            );
        }
        Ok(self.load())
    }

    /// Derives the worker's own configuration document.
    pub fn generate_worker_config(
        &self,
        config: &MiningConfig,
        threads: usize,
        priority: Priority,
    ) -> Value {
        json!({
            "autosave": false,
            "background": false,
            "colors": false,
            "donate-level": 1,
            "log-file": self.paths.worker_log_file(),
            "cpu": {
                "enabled": true,
                "huge-pages": true,
                "hw-aes": null,
                "priority": priority.level(),
                "max-threads-hint": threads,
            },
            "pools": [{
                "url": config.pool_url,
                "user": config.wallet_address,
                "pass": config.worker_name,
                "keepalive": true,
                "tls": config.use_ssl,
            }],
            "api": {
                "id": null,
                "worker-id": config.worker_name,
            },
        })
    }

    /// Writes the worker configuration artifact with owner-only permissions.
    pub fn write_worker_config(&self, document: &Value) -> Result<PathBuf, ConfigError> {
        let path = self.paths.worker_config_file();
        write_private(&path, &serde_json::to_vec_pretty(document)?)?;
        Ok(path)
    }

    /// Deletes the worker configuration artifact if present.
    pub fn remove_worker_config(&self) -> Result<(), ConfigError> {
        let path = self.paths.worker_config_file();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, config: &MiningConfig) -> Result<(), ConfigError> {
        write_private(
            &self.paths.config_file(),
            &serde_json::to_vec_pretty(config)?,
        )
    }
}

fn read_config(path: &Path) -> Result<MiningConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Replaces `path` atomically with `contents`, readable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(PRIVATE_FILE_MODE)
            .open(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::set_permissions(&tmp, fs::Permissions::from_mode(PRIVATE_FILE_MODE))?;
    fs::rename(&tmp, path)?;
    Ok(())
}
