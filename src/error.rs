//! Error handling for onyxd.
use std::path::PathBuf;

use thiserror::Error;

use crate::ipc::ControlError;

/// Errors that abort daemon startup or orchestration.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The runtime directory or one of its files could not be prepared.
    #[error("Failed to prepare runtime directory {path:?}: {source}")]
    RuntimeDir {
        /// Directory that could not be created or secured.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The control socket could not be bound.
    #[error("Failed to bind control socket {path:?}: {source}")]
    Bind {
        /// Socket path that was requested.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Another daemon already owns the runtime directory.
    #[error("onyxd is already running with PID {0}")]
    AlreadyRunning(i32),

    /// Error installing the shutdown signal handler.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Error from the configuration collaborator.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The PID file could not be read or written.
    #[error("Runtime file error: {0}")]
    Control(#[from] ControlError),

    /// Any other I/O failure during startup.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while launching or signalling the worker.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Attempted to start the worker in the stopped mode.
    #[error("Cannot start mining in stopped mode")]
    StoppedMode,

    /// The configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The generated worker configuration could not be written.
    #[error("Failed to write worker configuration: {0}")]
    ConfigArtifact(#[source] ConfigError),

    /// The worker process could not be spawned.
    #[error("Failed to start worker '{binary}': {source}")]
    Spawn {
        /// Binary that was executed.
        binary: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The worker binary did not pass the availability probe.
    #[error("Worker binary not available: {0}")]
    Unavailable(String),

    /// Signalling the worker's process group failed.
    #[error("Failed to signal worker process group {pgid}: {source}")]
    Signal {
        /// Process group that was targeted.
        pgid: i32,
        /// The underlying errno.
        #[source]
        source: nix::errno::Errno,
    },

    /// Generic I/O failure while managing the worker.
    #[error("Worker I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the configuration collaborator.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration does not satisfy the validity predicate.
    #[error("{0}")]
    Invalid(String),

    /// Error reading or writing a configuration file.
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    /// Error (de)serialising JSON configuration.
    #[error("Invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),
}
