//! Command-line interface for onyxd.
use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{ArgAction, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// `--log-level` value: a level name or its number, 0 (off) through 5
/// (trace). Without it onyxd honours `RUST_LOG`, then falls back to `info`.
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

const LEVELS: [(LevelFilter, &str); 6] = [
    (LevelFilter::OFF, "off"),
    (LevelFilter::ERROR, "error"),
    (LevelFilter::WARN, "warn"),
    (LevelFilter::INFO, "info"),
    (LevelFilter::DEBUG, "debug"),
    (LevelFilter::TRACE, "trace"),
];

impl LogLevelArg {
    /// Directive handed to the daemon's `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        LEVELS
            .iter()
            .find(|(level, _)| *level == self.0)
            .map_or("info", |(_, name)| *name)
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = value.parse::<usize>() {
            return LEVELS
                .get(number)
                .map(|(level, _)| LogLevelArg(*level))
                .ok_or_else(|| format!("log level {number} is out of range (0-5)"));
        }

        let lowercase = value.to_ascii_lowercase();
        let name = match lowercase.as_str() {
            "err" => "error",
            "warning" => "warn",
            other => other,
        };
        LEVELS
            .iter()
            .find(|(_, candidate)| *candidate == name)
            .map(|(level, _)| LogLevelArg(*level))
            .ok_or_else(|| format!("unknown log level '{value}'"))
    }
}

/// Command-line interface for onyxd.
#[derive(Parser, Debug)]
#[command(name = "onyxd", version, author)]
#[command(about = "Supervisor daemon for a CPU mining worker", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// State directory (defaults to `$ONYXD_HOME`, then `~/.onyx_monero`).
    #[arg(long, value_name = "DIR", global = true)]
    pub home: Option<PathBuf>,

    /// Seconds to wait for the daemon to answer a client command.
    #[arg(long, value_name = "SECS", default_value_t = 10, global = true)]
    pub timeout: u64,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}

/// Available commands for onyxd.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the supervisor daemon.
    Daemon {
        /// Detach from the terminal and log to `daemon.log`.
        #[arg(long)]
        daemonize: bool,

        /// Worker binary to supervise (defaults to `xmrig` on `PATH`).
        #[arg(long, value_name = "PATH")]
        worker_bin: Option<PathBuf>,
    },

    /// Check that the daemon is alive.
    Ping,

    /// Show the current mining mode and thread usage.
    Status,

    /// Show the full state snapshot with recent worker output.
    Logs {
        /// Number of log lines to show.
        #[arg(short, long, default_value = "20")]
        lines: usize,
    },

    /// Start mining in the given mode (`background` or `high_intensity`).
    Start {
        /// Mining mode.
        mode: String,
    },

    /// Stop mining.
    Stop,

    /// Show host CPU, memory and thermal information.
    SystemInfo,

    /// Read or update the mining configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the stored configuration.
    Show,

    /// Update the given fields; the others keep their current values.
    Set {
        /// Payout wallet address.
        #[arg(long)]
        wallet: Option<String>,

        /// Pool endpoint as `host:port`.
        #[arg(long)]
        pool: Option<String>,

        /// Worker name reported to the pool.
        #[arg(long)]
        worker: Option<String>,

        /// Use TLS for the pool connection.
        #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
        tls: Option<bool>,

        /// Profile label.
        #[arg(long)]
        profile: Option<String>,
    },
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
