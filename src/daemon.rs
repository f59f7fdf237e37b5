//! Daemon orchestration: builds the state, controller and command server once
//! and drives them from startup to shutdown.
use std::sync::{
    Arc,
    mpsc::{self, Receiver, Sender},
};

use nix::{errno::Errno, sys::signal, unistd::Pid};
use tracing::{debug, error, info, warn};

use crate::{
    config::ConfigStore,
    constants::DAEMON_VERSION,
    controller::{ControllerSettings, ProcessController},
    error::DaemonError,
    ipc,
    runtime::RuntimePaths,
    server::{CommandHandler, CommandServer},
    state::SupervisorState,
};

/// Reason recorded when startup stops a worker left over from a previous run.
pub const RESTART_CLEANUP_REASON: &str = "Daemon restart cleanup";

/// Triggers the same shutdown path as SIGINT/SIGTERM.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Sender<()>);

impl ShutdownHandle {
    pub fn trigger(&self) {
        let _ = self.0.send(());
    }
}

/// The running daemon.
pub struct Daemon {
    paths: RuntimePaths,
    config: ConfigStore,
    controller: Arc<ProcessController>,
    server: CommandServer,
    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
    owns_pid_file: bool,
}

impl Daemon {
    /// Prepares the runtime directory and wires the components together. The
    /// worker probe runs here; a missing worker leaves the daemon usable.
    pub fn new(paths: RuntimePaths, settings: ControllerSettings) -> Result<Self, DaemonError> {
        paths.ensure_dirs()?;

        let config = ConfigStore::new(paths.clone());
        let state = Arc::new(SupervisorState::new());
        let controller = Arc::new(ProcessController::new(
            Arc::clone(&state),
            config.clone(),
            settings,
        ));
        if let Err(err) = controller.probe_availability() {
            warn!("{err}; mining commands will fail until it is installed");
        }

        let handler = Arc::new(CommandHandler::new(Arc::clone(&controller), config.clone()));
        let server = CommandServer::new(paths.socket(), handler);
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        Ok(Self {
            paths,
            config,
            controller,
            server,
            shutdown_tx,
            shutdown_rx,
            owns_pid_file: false,
        })
    }

    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    pub fn controller(&self) -> &Arc<ProcessController> {
        &self.controller
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Routes SIGINT and SIGTERM into the shutdown channel. Can only be
    /// installed once per process.
    pub fn install_signal_handlers(&self) -> Result<(), DaemonError> {
        let handle = self.shutdown_handle();
        ctrlc::set_handler(move || handle.trigger())?;
        Ok(())
    }

    /// Claims the PID file, ensures a config exists, clears any leftover
    /// worker and starts the command server.
    pub fn start(&mut self) -> Result<(), DaemonError> {
        info!("Starting onyxd {DAEMON_VERSION}");

        self.claim_pid_file()?;
        self.config.create_default_if_missing()?;

        let report = self.controller.stop(RESTART_CLEANUP_REASON);
        if !report.is_clean() {
            warn!("Startup cleanup incomplete: {}", report.summary());
        }

        self.server.start()?;
        info!("onyxd started successfully");
        info!("Daemon is running but not mining - waiting for commands");
        Ok(())
    }

    /// Starts, blocks until a shutdown is requested, then shuts down.
    pub fn run(&mut self) -> Result<(), DaemonError> {
        if let Err(err) = self.start() {
            // Never sweep workers that belong to another daemon.
            if self.owns_pid_file {
                self.shutdown();
            }
            return Err(err);
        }

        if self.shutdown_rx.recv().is_ok() {
            info!("Received shutdown signal, shutting down...");
        }
        self.shutdown();
        Ok(())
    }

    /// Stops the worker first, then the command server.
    pub fn shutdown(&mut self) {
        info!("Shutting down onyxd");

        let report = self.controller.shutdown();
        if !report.is_clean() {
            error!("Worker cleanup incomplete: {}", report.summary());
        }

        self.server.stop();

        if self.owns_pid_file {
            ipc::cleanup_runtime(&self.paths);
            self.owns_pid_file = false;
        }
        info!("Daemon shutdown complete");
    }

    fn claim_pid_file(&mut self) -> Result<(), DaemonError> {
        let own = std::process::id() as i32;
        match ipc::read_daemon_pid(&self.paths) {
            Ok(Some(pid)) if pid != own => {
                match signal::kill(Pid::from_raw(pid), None) {
                    Ok(()) | Err(Errno::EPERM) => return Err(DaemonError::AlreadyRunning(pid)),
                    Err(_) => {
                        debug!("Removing stale runtime files left by PID {pid}");
                        ipc::cleanup_runtime(&self.paths);
                    }
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!("Ignoring unreadable PID file: {err}");
                ipc::cleanup_runtime(&self.paths);
            }
        }

        ipc::write_daemon_pid(&self.paths, own)?;
        self.owns_pid_file = true;
        Ok(())
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if self.owns_pid_file {
            self.shutdown();
        }
    }
}
