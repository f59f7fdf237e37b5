//! Shared supervisor state: mining mode, worker PID, thread allocation and the
//! rolling log buffer.
//!
//! Every mutation goes through one mutex so readers never observe a torn
//! record. A small set of atomics mirrors the mode and thread count for the
//! cheap `status` endpoint, which must answer even while a lifecycle operation
//! holds the lock.
use std::{
    collections::VecDeque,
    sync::{
        Mutex, MutexGuard, PoisonError, TryLockError,
        atomic::{AtomicU8, AtomicUsize, Ordering},
    },
    time::Instant,
};

use chrono::Local;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{error, info};

use crate::{
    constants::{BACKGROUND_THREAD_SHARE, HIGH_INTENSITY_THREAD_SHARE, LOG_BUFFER_CAPACITY},
    system,
};

/// Mining mode of the supervised worker.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Mode {
    /// No worker running.
    Stopped,
    /// Roughly half the cores at low priority.
    Background,
    /// Most of the cores at high priority.
    #[serde(alias = "money_hunter")]
    #[strum(to_string = "high_intensity", serialize = "money_hunter")]
    HighIntensity,
}

impl Mode {
    /// Modes a client may request.
    pub const ACTIVE: [Mode; 2] = [Mode::Background, Mode::HighIntensity];

    pub fn is_active(self) -> bool {
        self != Mode::Stopped
    }

    fn as_u8(self) -> u8 {
        match self {
            Mode::Stopped => 0,
            Mode::Background => 1,
            Mode::HighIntensity => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Mode::Background,
            2 => Mode::HighIntensity,
            _ => Mode::Stopped,
        }
    }
}

/// Scheduling priority handed to the worker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    None,
    Low,
    High,
}

impl Priority {
    /// Numeric level written into the worker configuration.
    pub const fn level(self) -> u8 {
        match self {
            Priority::None => 0,
            Priority::Low => 1,
            Priority::High => 3,
        }
    }
}

/// Thread count and priority for `mode` on a machine with `total` logical cores.
///
/// Active modes always get at least one thread.
pub fn allocation_for(total: usize, mode: Mode) -> (usize, Priority) {
    let share = |fraction: f64| ((total as f64 * fraction).floor() as usize).max(1);
    match mode {
        Mode::Background => (share(BACKGROUND_THREAD_SHARE), Priority::Low),
        Mode::HighIntensity => (share(HIGH_INTENSITY_THREAD_SHARE), Priority::High),
        Mode::Stopped => (0, Priority::None),
    }
}

/// Fixed-capacity FIFO of log lines; the oldest line is evicted on overflow.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    capacity: usize,
    lines: VecDeque<String>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lines: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Returns the last `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let start = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(start).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_BUFFER_CAPACITY)
    }
}

/// Immutable copy of the supervisor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub is_active: bool,
    pub pid: Option<u32>,
    pub threads_active: usize,
    pub total_threads: usize,
    pub hashrate: Option<String>,
    pub uptime_seconds: Option<u64>,
    pub last_error: Option<String>,
    pub log_tail: Vec<String>,
}

/// Lock-free view of the mode and thread count. Values may lag a concurrent
/// transition by one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusHint {
    pub mode: Mode,
    pub is_active: bool,
    pub threads_active: usize,
    pub total_threads: usize,
}

#[derive(Debug)]
struct Inner {
    mode: Mode,
    pid: Option<u32>,
    threads_active: usize,
    started_at: Option<Instant>,
    last_error: Option<String>,
    hashrate: Option<String>,
    logs: LogBuffer,
}

impl Inner {
    fn push_log(&mut self, message: &str) {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        self.logs.push(line);
    }

    fn snapshot(&self, total_threads: usize) -> Snapshot {
        let uptime_seconds = match (self.mode.is_active(), self.started_at) {
            (true, Some(started)) => Some(started.elapsed().as_secs()),
            _ => None,
        };
        Snapshot {
            mode: self.mode,
            is_active: self.mode.is_active() && self.pid.is_some(),
            pid: self.pid,
            threads_active: self.threads_active,
            total_threads,
            hashrate: self.hashrate.clone(),
            uptime_seconds,
            last_error: self.last_error.clone(),
            log_tail: self.logs.tail(self.logs.capacity()),
        }
    }
}

/// Thread-safe record of the supervised worker.
#[derive(Debug)]
pub struct SupervisorState {
    inner: Mutex<Inner>,
    total_threads: usize,
    mode_hint: AtomicU8,
    threads_hint: AtomicUsize,
}

impl SupervisorState {
    /// Creates a stopped state sized to the host's logical core count.
    pub fn new() -> Self {
        Self::with_total_threads(system::logical_cores())
    }

    /// Creates a stopped state for a machine with `total_threads` logical cores.
    pub fn with_total_threads(total_threads: usize) -> Self {
        let total_threads = total_threads.max(1);
        info!("Initialized supervisor state - {total_threads} CPU threads available");
        Self {
            inner: Mutex::new(Inner {
                mode: Mode::Stopped,
                pid: None,
                threads_active: 0,
                started_at: None,
                last_error: None,
                hashrate: None,
                logs: LogBuffer::default(),
            }),
            total_threads,
            mode_hint: AtomicU8::new(Mode::Stopped.as_u8()),
            threads_hint: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_hint(&self, inner: &Inner) {
        self.mode_hint.store(inner.mode.as_u8(), Ordering::Release);
        self.threads_hint
            .store(inner.threads_active, Ordering::Release);
    }

    /// Records a launched worker. Refuses `Mode::Stopped` without mutating.
    pub fn start(&self, mode: Mode, pid: u32, threads: usize) -> bool {
        if !mode.is_active() {
            return false;
        }

        let mut inner = self.lock();
        inner.mode = mode;
        inner.pid = Some(pid);
        inner.threads_active = threads;
        inner.started_at = Some(Instant::now());
        inner.last_error = None;
        inner.hashrate = None;
        inner.push_log(&format!(
            "Mining started: {mode} mode with {threads} threads (PID: {pid})"
        ));
        self.publish_hint(&inner);
        info!("Mining started: {mode} mode, {threads} threads, PID {pid}");
        true
    }

    /// Transitions to `Mode::Stopped`. Returns `false` and changes nothing if
    /// already stopped.
    pub fn stop(&self, reason: &str) -> bool {
        let inner = self.lock();
        if !inner.mode.is_active() {
            return false;
        }
        self.stop_locked(inner, reason)
    }

    /// Like [`SupervisorState::stop`], but only while `pid` is still the
    /// recorded worker. A newer session is left alone.
    pub fn stop_worker(&self, pid: u32, reason: &str) -> bool {
        let inner = self.lock();
        if !inner.mode.is_active() || inner.pid != Some(pid) {
            return false;
        }
        self.stop_locked(inner, reason)
    }

    fn stop_locked(&self, mut inner: MutexGuard<'_, Inner>, reason: &str) -> bool {
        let previous = inner.mode;
        inner.mode = Mode::Stopped;
        inner.pid = None;
        inner.threads_active = 0;
        inner.started_at = None;
        inner.hashrate = None;
        inner.push_log(&format!("Mining stopped: {reason}"));
        self.publish_hint(&inner);
        info!("Mining stopped: {previous} -> stopped, reason: {reason}");
        true
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        let mut inner = self.lock();
        inner.push_log(&format!("ERROR: {message}"));
        inner.last_error = Some(message.clone());
        drop(inner);
        error!("{message}");
    }

    pub fn clear_error(&self) {
        self.lock().last_error = None;
    }

    /// Appends a timestamped line to the rolling buffer.
    pub fn add_log(&self, message: &str) {
        self.lock().push_log(message);
        info!(target: "onyxd::worker", "{message}");
    }

    pub fn update_hashrate(&self, value: impl Into<String>) {
        self.lock().hashrate = Some(value.into());
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot(self.total_threads)
    }

    /// Snapshot without waiting on the lock; `None` when it is contended.
    pub fn try_snapshot(&self) -> Option<Snapshot> {
        match self.inner.try_lock() {
            Ok(inner) => Some(inner.snapshot(self.total_threads)),
            Err(TryLockError::Poisoned(poisoned)) => {
                Some(poisoned.into_inner().snapshot(self.total_threads))
            }
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Reads the mode and thread count without taking the state lock.
    pub fn status_hint(&self) -> StatusHint {
        let mode = Mode::from_u8(self.mode_hint.load(Ordering::Acquire));
        StatusHint {
            mode,
            is_active: mode.is_active(),
            threads_active: self.threads_hint.load(Ordering::Acquire),
            total_threads: self.total_threads,
        }
    }

    pub fn log_tail(&self, lines: usize) -> Vec<String> {
        self.lock().logs.tail(lines)
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    pub fn pid(&self) -> Option<u32> {
        self.lock().pid
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn total_threads(&self) -> usize {
        self.total_threads
    }

    /// Thread count and priority for `mode` on this host.
    pub fn threads_and_priority_for(&self, mode: Mode) -> (usize, Priority) {
        allocation_for(self.total_threads, mode)
    }
}

impl Default for SupervisorState {
    fn default() -> Self {
        Self::new()
    }
}
