//! Constants and tuning values for the onyxd daemon.
//!
//! Timeouts, capacities and file names used across the state, controller and
//! command server live here so they can be read side by side.

use std::time::Duration;

// ============================================================================
// Identity
// ============================================================================

/// Version reported by the `ping` command.
pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Worker binary looked up on `PATH` when none is configured.
pub const DEFAULT_WORKER_BINARY: &str = "xmrig";

/// Flag passed to the worker binary by the availability probe.
pub const WORKER_VERSION_FLAG: &str = "--version";

/// Flag that points the worker at its generated configuration file.
pub const WORKER_CONFIG_FLAG: &str = "--config";

// ============================================================================
// File System Constants
// ============================================================================

/// Directory under `$HOME` holding every runtime artifact.
pub const STATE_DIR_NAME: &str = ".onyx_monero";

/// Environment variable overriding the state directory.
pub const HOME_OVERRIDE_ENV: &str = "ONYXD_HOME";

/// Persisted mining configuration.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration artifact generated for each worker launch.
pub const WORKER_CONFIG_FILE_NAME: &str = "worker-runtime.json";

/// Log file the worker is told to write to.
pub const WORKER_LOG_FILE_NAME: &str = "worker.log";

/// Unix socket clients connect to.
pub const SOCKET_FILE_NAME: &str = "daemon.sock";

/// PID of the resident daemon.
pub const PID_FILE_NAME: &str = "daemon.pid";

/// Daemon log file used when running detached.
pub const DAEMON_LOG_FILE_NAME: &str = "daemon.log";

/// Owner-only permissions for files holding wallet details or the socket.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Owner-only permissions for the state directory.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

// ============================================================================
// Supervisor State
// ============================================================================

/// Lines retained in the rolling log buffer.
pub const LOG_BUFFER_CAPACITY: usize = 50;

/// Fraction of logical cores used in background mode.
pub const BACKGROUND_THREAD_SHARE: f64 = 0.5;

/// Fraction of logical cores used in high-intensity mode.
pub const HIGH_INTENSITY_THREAD_SHARE: f64 = 0.8;

/// Niceness applied to low-priority workers.
pub const LOW_PRIORITY_NICE: i32 = 10;

// ============================================================================
// Process Management Timing
// ============================================================================

/// Upper bound on the `--version` availability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Time a worker gets to exit after SIGTERM.
pub const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Time a worker gets to exit after SIGKILL.
pub const FORCED_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a quick stop waits for the monitor to wind down.
pub const QUICK_STOP_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// How long a full stop waits for the monitor to wind down.
pub const MONITOR_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Bounded wait for one line of worker output.
pub const OUTPUT_READ_WAIT: Duration = Duration::from_secs(1);

/// Pause between monitor iterations.
pub const MONITOR_IDLE_SLEEP: Duration = Duration::from_millis(100);

/// Interval between liveness checks while waiting on a child.
pub const PROCESS_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// Command Server
// ============================================================================

/// Largest request or response accepted on the control socket.
pub const MESSAGE_CEILING: usize = 8192;

/// Read timeout applied to each client connection.
pub const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval at which the non-blocking accept loop polls for clients.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Deadline for in-flight client handlers during server shutdown.
pub const CLIENT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of log lines returned by the `logs` command.
pub const DEFAULT_LOG_TAIL: usize = 20;

/// Keywords that flag a worker output line as suspicious.
pub const ERROR_KEYWORDS: [&str; 4] = ["error", "failed", "cannot", "unable"];
