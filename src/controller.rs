//! Lifecycle management for the external mining worker.
//!
//! The controller owns at most one worker process at a time together with the
//! monitor thread that scrapes its output. Workers are launched in their own
//! process group so that stop requests can signal the whole tree.
use std::{
    fmt,
    io::{self, BufRead, BufReader, PipeReader, Read},
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, TryLockError,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::{Pid, getpgrp},
};
use strum_macros::Display;
use tracing::{debug, error, info, warn};

use crate::{
    config::{ConfigStore, MiningConfig},
    constants::{
        DEFAULT_WORKER_BINARY, ERROR_KEYWORDS, FORCED_STOP_TIMEOUT, GRACEFUL_STOP_TIMEOUT,
        LOW_PRIORITY_NICE, MONITOR_IDLE_SLEEP, MONITOR_JOIN_TIMEOUT, OUTPUT_READ_WAIT,
        PROBE_TIMEOUT, PROCESS_POLL_INTERVAL, QUICK_STOP_JOIN_TIMEOUT, WORKER_CONFIG_FLAG,
        WORKER_VERSION_FLAG,
    },
    error::ControllerError,
    state::{Mode, Priority, Snapshot, SupervisorState},
    system,
};

/// Reason recorded when the worker exits without being asked to.
pub const UNEXPECTED_EXIT_REASON: &str = "Process terminated unexpectedly";

/// Reason recorded when the daemon tears the worker down on exit.
pub const SHUTDOWN_REASON: &str = "Daemon shutdown";

/// Worker binary and the timeouts governing its lifecycle.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub worker_binary: PathBuf,
    pub probe_timeout: Duration,
    pub graceful_timeout: Duration,
    pub forced_timeout: Duration,
    pub quick_join_timeout: Duration,
    pub monitor_join_timeout: Duration,
    pub read_wait: Duration,
    pub idle_sleep: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            worker_binary: PathBuf::from(DEFAULT_WORKER_BINARY),
            probe_timeout: PROBE_TIMEOUT,
            graceful_timeout: GRACEFUL_STOP_TIMEOUT,
            forced_timeout: FORCED_STOP_TIMEOUT,
            quick_join_timeout: QUICK_STOP_JOIN_TIMEOUT,
            monitor_join_timeout: MONITOR_JOIN_TIMEOUT,
            read_wait: OUTPUT_READ_WAIT,
            idle_sleep: MONITOR_IDLE_SLEEP,
        }
    }
}

impl ControllerSettings {
    /// Uses `binary` as the worker, keeping the default timeouts.
    pub fn with_worker_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            worker_binary: binary.into(),
            ..Self::default()
        }
    }

    /// File name used to recognise stray workers during the orphan sweep.
    fn worker_process_name(&self) -> Option<String> {
        self.worker_binary
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Individual steps of a full stop. Each one may fail without aborting the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CleanupStep {
    Terminate,
    WaitExit,
    ForceKill,
    OrphanSweep,
    MonitorJoin,
    RemoveArtifact,
}

/// Aggregate outcome of a stop: every failed step, in the order it ran.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StopReport {
    /// Whether a live worker was being tracked when the stop began.
    pub was_running: bool,
    pub failures: Vec<(CleanupStep, String)>,
}

impl StopReport {
    fn record(&mut self, step: CleanupStep, err: impl fmt::Display) {
        self.failures.push((step, err.to_string()));
    }

    fn absorb(&mut self, other: StopReport) {
        self.was_running |= other.was_running;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line description of every failure.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|(step, err)| format!("{step}: {err}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// The live worker: its process, the monitor thread and the flag that cancels it.
struct WorkerHandle {
    pid: u32,
    child: Arc<Mutex<Child>>,
    cancel: Arc<AtomicBool>,
    monitor: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        lock_child(&self.child).try_wait()
    }

    fn cancel_monitor(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Waits for the monitor thread up to `timeout`; returns `false` if it is
    /// still running afterwards.
    fn join_monitor(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.monitor.take() else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(PROCESS_POLL_INTERVAL);
        }
        if handle.join().is_err() {
            warn!("Worker monitor thread panicked");
        }
        true
    }
}

/// Owns the single worker process and its monitor.
pub struct ProcessController {
    state: Arc<SupervisorState>,
    config: ConfigStore,
    settings: ControllerSettings,
    worker: Mutex<Option<WorkerHandle>>,
}

impl ProcessController {
    pub fn new(
        state: Arc<SupervisorState>,
        config: ConfigStore,
        settings: ControllerSettings,
    ) -> Self {
        debug!(
            "Initializing process controller for worker {:?}",
            settings.worker_binary
        );
        Self {
            state,
            config,
            settings,
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &Arc<SupervisorState> {
        &self.state
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<WorkerHandle>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the worker with its version flag and reports the first line of
    /// output. Failures are recorded in the state; the daemon keeps running.
    pub fn probe_availability(&self) -> Result<String, ControllerError> {
        let result = self.run_probe();
        match &result {
            Ok(version) => info!("Worker available: {version}"),
            Err(err) => self.state.set_error(err.to_string()),
        }
        result
    }

    fn run_probe(&self) -> Result<String, ControllerError> {
        let binary = self.settings.worker_binary.display().to_string();
        let mut child = Command::new(&self.settings.worker_binary)
            .arg(WORKER_VERSION_FLAG)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| ControllerError::Unavailable(format!("{binary}: {err}")))?;

        let stdout = child.stdout.take();
        let child = Mutex::new(child);
        match wait_for_exit(&child, self.settings.probe_timeout)? {
            Some(status) if status.success() => {
                let mut output = String::new();
                if let Some(mut out) = stdout {
                    let _ = out.read_to_string(&mut output);
                }
                Ok(output
                    .lines()
                    .next()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .unwrap_or("unknown")
                    .to_string())
            }
            Some(status) => Err(ControllerError::Unavailable(format!(
                "{binary} version check failed ({status})"
            ))),
            None => {
                let mut child = lock_child(&child);
                let _ = child.kill();
                let _ = child.wait();
                Err(ControllerError::Unavailable(format!(
                    "{binary} did not answer within {:?}",
                    self.settings.probe_timeout
                )))
            }
        }
    }

    /// Launches the worker in `mode`. An already running worker is quick-stopped
    /// first. Failures are recorded in the state before being returned.
    pub fn start(&self, mode: Mode, config: &MiningConfig) -> Result<u32, ControllerError> {
        if !mode.is_active() {
            error!("Cannot start mining in stopped mode");
            return Err(ControllerError::StoppedMode);
        }

        let mut slot = self.lock_worker();
        if self.reconcile_locked(&mut slot)
            && let Some(handle) = slot.take()
        {
            self.quick_stop(handle, &format!("Switching to {mode} mode"));
        }

        let (threads, priority) = self.state.threads_and_priority_for(mode);

        if let Err(err) = config.validate() {
            let err = ControllerError::InvalidConfig(err.to_string());
            self.state.set_error(err.to_string());
            return Err(err);
        }

        match self.launch(mode, config, threads, priority) {
            Ok(handle) => {
                let pid = handle.pid;
                *slot = Some(handle);
                info!("Started worker: PID {pid}, {threads} threads, {mode} mode");
                Ok(pid)
            }
            Err(err) => {
                self.state.set_error(err.to_string());
                if let Err(cleanup) = self.config.remove_worker_config() {
                    debug!("Failed to remove worker config after failed start: {cleanup}");
                }
                Err(err)
            }
        }
    }

    /// Writes the worker's configuration and hands the spawn to a monitor
    /// thread. The worker's parent-death signal is bound to the thread that
    /// forked it, so that thread has to outlive the worker; the monitor does.
    fn launch(
        &self,
        mode: Mode,
        config: &MiningConfig,
        threads: usize,
        priority: Priority,
    ) -> Result<WorkerHandle, ControllerError> {
        let document = self.config.generate_worker_config(config, threads, priority);
        let config_path = self
            .config
            .write_worker_config(&document)
            .map_err(ControllerError::ConfigArtifact)?;

        let binary = self.settings.worker_binary.clone();
        let nice = (priority == Priority::Low).then_some(LOW_PRIORITY_NICE);
        let cancel = Arc::new(AtomicBool::new(false));
        let (spawned_tx, spawned_rx) = mpsc::channel();

        let monitor = {
            let state = Arc::clone(&self.state);
            let cancel = Arc::clone(&cancel);
            let binary = binary.clone();
            let read_wait = self.settings.read_wait;
            let idle_sleep = self.settings.idle_sleep;
            thread::Builder::new()
                .name("worker-monitor".into())
                .spawn(move || {
                    let (child, output) = match spawn_worker(&binary, &config_path, nice) {
                        Ok(spawned) => spawned,
                        Err(err) => {
                            let _ = spawned_tx.send(Err(err));
                            return;
                        }
                    };
                    let pid = child.id();
                    state.start(mode, pid, threads);
                    let child = Arc::new(Mutex::new(child));
                    let _ = spawned_tx.send(Ok(Arc::clone(&child)));
                    monitor_worker(&state, pid, &child, &cancel, &output, read_wait, idle_sleep);
                })?
        };

        match spawned_rx.recv() {
            Ok(Ok(child)) => {
                let pid = lock_child(&child).id();
                Ok(WorkerHandle {
                    pid,
                    child,
                    cancel,
                    monitor: Some(monitor),
                })
            }
            Ok(Err(err)) => {
                let _ = monitor.join();
                Err(err)
            }
            Err(_) => {
                let _ = monitor.join();
                Err(ControllerError::Spawn {
                    binary: binary.display().to_string(),
                    source: io::Error::other("worker monitor exited before spawning"),
                })
            }
        }
    }

    /// Kills the worker's group immediately for a low-latency mode switch.
    fn quick_stop(&self, mut handle: WorkerHandle, reason: &str) {
        info!("Quick stopping worker PID {}: {reason}", handle.pid);
        handle.cancel_monitor();

        if let Err(err) = signal_group(handle.pid, Signal::SIGKILL) {
            self.state
                .set_error(format!("Error quick stopping mining: {err}"));
        }
        match wait_for_exit(&handle.child, self.settings.quick_join_timeout) {
            Ok(Some(_)) => debug!("Worker PID {} force killed for mode switch", handle.pid),
            Ok(None) => warn!("Worker PID {} still running after SIGKILL", handle.pid),
            Err(err) => warn!("Failed to reap worker PID {}: {err}", handle.pid),
        }

        if !handle.join_monitor(self.settings.quick_join_timeout) {
            debug!("Monitor for PID {} still winding down", handle.pid);
        }
        self.state.stop(reason);
    }

    /// Graceful stop: SIGTERM, escalate to SIGKILL, sweep orphans, join the
    /// monitor, update the state and delete the worker config. Every step runs
    /// even when an earlier one fails.
    pub fn stop(&self, reason: &str) -> StopReport {
        let mut slot = self.lock_worker();
        let mut report = StopReport::default();

        if !self.reconcile_locked(&mut slot) {
            // Nothing alive to stop; make sure the state agrees.
            self.state.stop(reason);
            return report;
        }
        let Some(mut handle) = slot.take() else {
            return report;
        };
        report.was_running = true;
        let pid = handle.pid;
        info!("Stopping worker PID {pid}: {reason}");

        handle.cancel_monitor();

        if let Err(err) = signal_group(pid, Signal::SIGTERM) {
            report.record(CleanupStep::Terminate, err);
        }

        match wait_for_exit(&handle.child, self.settings.graceful_timeout) {
            Ok(Some(status)) => info!("Worker PID {pid} terminated gracefully ({status})"),
            Ok(None) => {
                warn!("Worker PID {pid} did not respond to SIGTERM, force killing");
                if let Err(err) = signal_group(pid, Signal::SIGKILL) {
                    report.record(CleanupStep::ForceKill, err);
                }
                match wait_for_exit(&handle.child, self.settings.forced_timeout) {
                    Ok(Some(_)) => info!("Worker PID {pid} force killed"),
                    Ok(None) => report.record(
                        CleanupStep::ForceKill,
                        format!("worker PID {pid} survived SIGKILL"),
                    ),
                    Err(err) => report.record(CleanupStep::WaitExit, err),
                }
            }
            Err(err) => report.record(CleanupStep::WaitExit, err),
        }

        if let Err(err) = self.sweep_orphans() {
            report.record(CleanupStep::OrphanSweep, err);
        }

        if !handle.join_monitor(self.settings.monitor_join_timeout) {
            report.record(
                CleanupStep::MonitorJoin,
                format!("monitor for PID {pid} did not finish in time"),
            );
        }

        self.state.stop(reason);

        if let Err(err) = self.config.remove_worker_config() {
            report.record(CleanupStep::RemoveArtifact, err);
        }

        if report.is_clean() {
            info!("Mining stopped successfully: {reason}");
        } else {
            self.state
                .set_error(format!("Error stopping mining: {}", report.summary()));
        }
        report
    }

    /// Whether a worker is running. Detects unexpected exits and reconciles
    /// them into the state.
    pub fn is_active(&self) -> bool {
        let mut slot = self.lock_worker();
        self.reconcile_locked(&mut slot)
    }

    /// Non-blocking [`ProcessController::is_active`]; `None` while a start or
    /// stop holds the worker slot.
    pub fn reconcile_exit(&self) -> Option<bool> {
        match self.worker.try_lock() {
            Ok(mut slot) => Some(self.reconcile_locked(&mut slot)),
            Err(TryLockError::Poisoned(poisoned)) => {
                Some(self.reconcile_locked(&mut poisoned.into_inner()))
            }
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn reconcile_locked(&self, slot: &mut Option<WorkerHandle>) -> bool {
        let Some(handle) = slot.as_ref() else {
            return false;
        };

        match handle.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                let pid = handle.pid;
                if let Some(handle) = slot.take() {
                    // The monitor notices the flag within one read cycle.
                    handle.cancel_monitor();
                }
                record_unexpected_exit(&self.state, pid, status);
                if let Err(err) = self.config.remove_worker_config() {
                    debug!("Failed to remove worker config: {err}");
                }
                false
            }
            Err(err) => {
                warn!("Failed to check worker PID {}: {err}", handle.pid);
                true
            }
        }
    }

    /// Full state snapshot after reconciling any unexpected exit.
    pub fn status(&self) -> Snapshot {
        let _ = self.reconcile_exit();
        self.state.snapshot()
    }

    /// Sends SIGTERM to every process named like the worker binary. Returns
    /// how many were signalled.
    pub fn sweep_orphans(&self) -> Result<usize, ControllerError> {
        let Some(name) = self.settings.worker_process_name() else {
            return Ok(0);
        };

        let mut signalled = 0;
        for pid in system::pids_named(&name) {
            match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => {
                    debug!("Sent SIGTERM to orphaned worker PID {pid}");
                    signalled += 1;
                }
                Err(Errno::ESRCH) => {}
                Err(Errno::EPERM) => debug!("Not permitted to signal PID {pid}; skipping"),
                Err(source) => {
                    return Err(ControllerError::Signal {
                        pgid: pid as i32,
                        source,
                    });
                }
            }
        }
        if signalled > 0 {
            info!("Cleaned up {signalled} orphaned worker process(es)");
        }
        Ok(signalled)
    }

    /// Stops any running worker, then sweeps for strays unconditionally.
    pub fn shutdown(&self) -> StopReport {
        info!("Shutting down process controller");
        let mut report = if self.is_active() {
            self.stop(SHUTDOWN_REASON)
        } else {
            StopReport::default()
        };

        let mut sweep = StopReport::default();
        if let Err(err) = self.sweep_orphans() {
            sweep.record(CleanupStep::OrphanSweep, err);
        }
        report.absorb(sweep);
        info!("Process controller shutdown complete");
        report
    }
}

impl Drop for ProcessController {
    fn drop(&mut self) {
        let slot = self.worker.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.cancel_monitor();
            let _ = signal_group(handle.pid, Signal::SIGKILL);
            let _ = lock_child(&handle.child).wait();
        }
    }
}

fn lock_child(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Polls `child` until it exits or `timeout` passes; `Ok(None)` on timeout.
/// The lock is released between polls so the monitor can still observe it.
fn wait_for_exit(child: &Mutex<Child>, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = lock_child(child).try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(PROCESS_POLL_INTERVAL);
    }
}

/// Signals the worker's process group. A group that no longer exists counts
/// as success.
fn signal_group(pid: u32, sig: Signal) -> Result<(), ControllerError> {
    let pgid = Pid::from_raw(pid as i32);
    if pgid == getpgrp() {
        return Err(ControllerError::Signal {
            pgid: pgid.as_raw(),
            source: Errno::EINVAL,
        });
    }

    match signal::killpg(pgid, sig) {
        Ok(()) => {
            debug!("Sent {sig} to worker process group {pgid}");
            Ok(())
        }
        Err(Errno::ESRCH) => {
            debug!("Worker process group {pgid} already gone");
            Ok(())
        }
        Err(source) => Err(ControllerError::Signal {
            pgid: pgid.as_raw(),
            source,
        }),
    }
}

fn record_unexpected_exit(state: &SupervisorState, pid: u32, status: ExitStatus) {
    if state.stop_worker(pid, UNEXPECTED_EXIT_REASON) {
        state.set_error(format!("Worker process terminated unexpectedly ({status})"));
    }
}

/// Forwards the worker's merged stdout/stderr as lines until EOF.
fn spawn_output_reader(pid: u32, reader: PipeReader, tx: Sender<String>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    debug!("Output reader for PID {pid} stopped: {err}");
                    break;
                }
            }
        }
        debug!("Output reader for PID {pid} reached EOF");
    });
}

/// Spawns the worker in a fresh process group with merged stdout/stderr.
fn spawn_worker(
    binary: &Path,
    config_path: &Path,
    nice: Option<i32>,
) -> Result<(Child, Receiver<String>), ControllerError> {
    let (reader, writer) = io::pipe()?;
    let mut cmd = Command::new(binary);
    cmd.arg(WORKER_CONFIG_FLAG)
        .arg(config_path)
        .stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);

    unsafe {
        cmd.pre_exec(move || {
            // Own process group so stop requests can signal the whole tree
            // without touching the daemon's group.
            if libc::setpgid(0, 0) < 0 {
                return Err(io::Error::last_os_error());
            }

            #[cfg(target_os = "linux")]
            {
                use libc::{PR_SET_PDEATHSIG, SIGTERM, prctl};
                if prctl(PR_SET_PDEATHSIG, SIGTERM, 0, 0, 0) < 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            if let Some(nice) = nice {
                // Best effort: a worker at default priority is still useful.
                let _ = libc::setpriority(libc::PRIO_PROCESS as _, 0, nice);
            }
            Ok(())
        });
    }

    debug!("Executing worker command: {cmd:?}");
    let child = cmd.spawn().map_err(|source| ControllerError::Spawn {
        binary: binary.display().to_string(),
        source,
    })?;
    // The command still holds the pipe's write ends; release them so the
    // reader sees EOF once the worker exits.
    drop(cmd);

    let (tx, rx) = mpsc::channel();
    spawn_output_reader(child.id(), reader, tx);
    Ok((child, rx))
}

/// Watches the worker until it exits or `cancel` is raised, folding its
/// output into the state. Runs on the thread that spawned the worker.
fn monitor_worker(
    state: &SupervisorState,
    pid: u32,
    child: &Mutex<Child>,
    cancel: &AtomicBool,
    output: &Receiver<String>,
    read_wait: Duration,
    idle_sleep: Duration,
) {
    info!("Started worker monitor for PID {pid}");
    while !cancel.load(Ordering::SeqCst) {
        let exited = lock_child(child).try_wait();
        match exited {
            Ok(Some(status)) => {
                for line in output.try_iter() {
                    process_output_line(state, &line);
                }
                if !cancel.load(Ordering::SeqCst) {
                    info!("Worker exited on its own ({status})");
                    record_unexpected_exit(state, pid, status);
                }
                break;
            }
            Ok(None) => {}
            Err(err) => {
                state.set_error(format!("Monitoring error: {err}"));
                break;
            }
        }

        match output.recv_timeout(read_wait) {
            // A stop may have landed while we were waiting; its lines no
            // longer belong to the current session.
            Ok(_) if cancel.load(Ordering::SeqCst) => break,
            Ok(line) => {
                process_output_line(state, &line);
                for line in output.try_iter() {
                    process_output_line(state, &line);
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }

        thread::sleep(idle_sleep);
    }
    info!("Worker monitor for PID {pid} stopped");
}

/// Folds one line of worker output into the state: log it, pick up the
/// hashrate and flag lines that mention an error.
pub fn process_output_line(state: &SupervisorState, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    state.add_log(line);

    if let Some(rate) = parse_hashrate(line) {
        state.update_hashrate(rate);
    }

    let lower = line.to_lowercase();
    if ERROR_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        if lower.contains("error") {
            state.set_error(format!("Worker error: {line}"));
        } else {
            warn!("Worker reported a problem: {line}");
        }
    }
}

/// Finds the first number immediately followed by a rate unit such as `H/s`
/// or `kH/s`. Placeholders such as `n/a` are skipped, so
/// `speed 10s/60s/15m n/a n/a n/a H/s max 850.1 H/s` yields `850.1 H/s`.
pub fn parse_hashrate(line: &str) -> Option<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.windows(2).find_map(|pair| {
        let (value, unit) = (pair[0], pair[1]);
        if !unit.to_ascii_lowercase().contains("h/s") {
            return None;
        }
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|_| format!("{value} {unit}"))
    })
}
