use std::{
    error::Error,
    fs::OpenOptions,
    os::unix::{fs::OpenOptionsExt, io::IntoRawFd},
    process::ExitCode,
};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use onyxd::{
    cli::{Cli, Commands, ConfigAction, parse_args},
    config::ConfigPatch,
    constants::PRIVATE_FILE_MODE,
    controller::ControllerSettings,
    daemon::Daemon,
    ipc,
    protocol::Request,
    runtime::RuntimePaths,
};

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = parse_args();
    let paths = RuntimePaths::resolve(args.home.as_deref());

    let request = match &args.command {
        Commands::Daemon {
            daemonize,
            worker_bin,
        } => {
            let settings = match worker_bin {
                // Relative paths must survive the chdir done when daemonizing.
                Some(binary) if binary.components().count() > 1 => {
                    ControllerSettings::with_worker_binary(std::path::absolute(binary)?)
                }
                Some(binary) => ControllerSettings::with_worker_binary(binary),
                None => ControllerSettings::default(),
            };
            run_daemon(&args, paths, settings, *daemonize)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Ping => Request::Ping,
        Commands::Status => Request::Status,
        Commands::Logs { lines } => Request::Logs { lines: *lines },
        Commands::Start { mode } => Request::Start { mode: mode.clone() },
        Commands::Stop => Request::Stop,
        Commands::SystemInfo => Request::SystemInfo,
        Commands::Config { action } => match action {
            ConfigAction::Show => Request::ConfigGet,
            ConfigAction::Set {
                wallet,
                pool,
                worker,
                tls,
                profile,
            } => {
                let patch = ConfigPatch {
                    wallet_address: wallet.clone(),
                    pool_url: pool.clone(),
                    worker_name: worker.clone(),
                    use_ssl: *tls,
                    profile_name: profile.clone(),
                };
                if patch.is_empty() {
                    return Err("config set needs at least one field to update".into());
                }
                Request::ConfigSet(patch)
            }
        },
    };

    init_logging(&args);
    let response = ipc::send_request(&paths.socket(), &request, args.request_timeout())?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_daemon(
    args: &Cli,
    paths: RuntimePaths,
    settings: ControllerSettings,
    daemonize: bool,
) -> Result<(), Box<dyn Error>> {
    let paths = RuntimePaths::new(std::path::absolute(paths.base_dir())?);
    paths.ensure_dirs()?;
    if daemonize {
        daemonize_onyxd()?;
        init_file_logging(args, &paths)?;
    } else {
        init_logging(args);
    }

    let mut daemon = Daemon::new(paths, settings)?;
    daemon.install_signal_handlers()?;
    if let Err(err) = daemon.run() {
        error!("Daemon exited with error: {err}");
        return Err(err.into());
    }
    info!("onyxd exited cleanly");
    Ok(())
}

fn env_filter(args: &Cli) -> EnvFilter {
    if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn init_logging(args: &Cli) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(args))
        .with_writer(std::io::stderr)
        .try_init();
}

fn init_file_logging(args: &Cli, paths: &RuntimePaths) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(PRIVATE_FILE_MODE)
        .open(paths.daemon_log_file())?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(args))
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .try_init();
    Ok(())
}

/// Detaches from the launching terminal: fork, new session, fork again so
/// the daemon can never reacquire a controlling terminal, then point the
/// standard streams at `/dev/null`. Logging goes to `daemon.log` afterwards.
fn daemonize_onyxd() -> std::io::Result<()> {
    fork_and_exit_parent()?;
    if unsafe { libc::setsid() } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    fork_and_exit_parent()?;

    std::env::set_current_dir("/")?;
    let null = OpenOptions::new().read(true).write(true).open("/dev/null")?;
    let fd = null.into_raw_fd();
    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if unsafe { libc::dup2(fd, target) } < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    unsafe {
        libc::close(fd);
    }
    Ok(())
}

fn fork_and_exit_parent() -> std::io::Result<()> {
    match unsafe { libc::fork() } {
        -1 => Err(std::io::Error::last_os_error()),
        0 => Ok(()),
        _ => std::process::exit(0),
    }
}
