//! Control socket server: one thread accepting connections, one thread per
//! client, one request and one response per connection.
use std::{
    fs, io,
    os::unix::{
        fs::PermissionsExt,
        net::{UnixListener, UnixStream},
    },
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use tracing::{debug, error, info, warn};

use crate::{
    config::{ConfigPatch, ConfigStore},
    constants::{
        ACCEPT_POLL_INTERVAL, CLIENT_JOIN_TIMEOUT, CLIENT_READ_TIMEOUT, DAEMON_VERSION,
        PRIVATE_FILE_MODE,
    },
    controller::ProcessController,
    error::DaemonError,
    ipc,
    protocol::{Request, Response},
    state::Mode,
    system::SystemInfo,
};

/// Reason recorded for stops requested over the socket.
pub const CLIENT_STOP_REASON: &str = "User requested via IPC";

/// Executes decoded requests against the controller and configuration.
pub struct CommandHandler {
    controller: Arc<ProcessController>,
    config: ConfigStore,
    system: SystemInfo,
}

impl CommandHandler {
    pub fn new(controller: Arc<ProcessController>, config: ConfigStore) -> Self {
        Self {
            controller,
            config,
            system: SystemInfo,
        }
    }

    /// Runs `request`. A panicking handler becomes an error response instead of
    /// taking the connection thread down with it.
    pub fn dispatch(&self, request: Request) -> Response {
        let name = request.name();
        debug!("Handling '{name}' request");
        match panic::catch_unwind(AssertUnwindSafe(|| self.handle(request))) {
            Ok(response) => response,
            Err(_) => {
                error!("Handler for '{name}' panicked");
                Response::failure(format!("Command failed: {name}"))
            }
        }
    }

    fn handle(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::message("pong").with("version", DAEMON_VERSION),
            Request::Status => self.status(),
            Request::SystemInfo => Response::success()
                .with("cpu", self.system.cpu())
                .with("memory", self.system.memory())
                .with("thermal", self.system.thermal()),
            Request::Start { mode } => self.start(&mode),
            Request::Stop => self.stop(),
            Request::ConfigGet => Response::success().with("config", self.config.load()),
            Request::ConfigSet(patch) => self.config_set(&patch),
            Request::Logs { lines } => self.logs(lines),
        }
    }

    /// Cheap status: mode and threads come from the lock-free hint; details
    /// are added only when the state lock is free.
    fn status(&self) -> Response {
        let _ = self.controller.reconcile_exit();
        let state = self.controller.state();
        let hint = state.status_hint();

        let mut response = Response::success()
            .with("mode", hint.mode)
            .with("is_active", hint.is_active)
            .with("threads_active", hint.threads_active)
            .with("total_threads", hint.total_threads);

        if let Some(snapshot) = state.try_snapshot() {
            response = response
                .with("pid", snapshot.pid)
                .with("hashrate", snapshot.hashrate)
                .with("uptime_seconds", snapshot.uptime_seconds)
                .with("last_error", snapshot.last_error);
        }
        response
    }

    fn start(&self, requested: &str) -> Response {
        let requested = requested.trim().to_lowercase();
        let mode = match Mode::from_str(&requested) {
            Ok(mode) if mode.is_active() => mode,
            _ => {
                return Response::failure(format!(
                    "Invalid mode: {requested}. Use 'background' or 'high_intensity'"
                ));
            }
        };

        let config = self.config.load();
        if let Err(err) = config.validate() {
            return Response::failure(format!("Configuration error: {err}"));
        }

        let controller = Arc::clone(&self.controller);
        thread::spawn(move || {
            if let Err(err) = controller.start(mode, &config) {
                error!("Failed to start {mode} mining: {err}");
            }
        });

        Response::message(format!("Starting {mode} mining..."))
    }

    fn stop(&self) -> Response {
        let report = self.controller.stop(CLIENT_STOP_REASON);
        if report.is_clean() {
            Response::message("Mining stopped")
        } else {
            Response::failure(format!("Failed to stop mining: {}", report.summary()))
        }
    }

    fn config_set(&self, patch: &ConfigPatch) -> Response {
        let updated = self.config.load().merged(patch);
        if let Err(err) = updated.validate() {
            return Response::failure(format!("Invalid configuration: {err}"));
        }
        match self.config.save(&updated) {
            Ok(()) => Response::message("Configuration updated"),
            Err(err) => Response::failure(format!("Failed to save configuration: {err}")),
        }
    }

    fn logs(&self, lines: usize) -> Response {
        let mut snapshot = self.controller.status();
        let skip = snapshot.log_tail.len().saturating_sub(lines);
        snapshot.log_tail.drain(..skip);
        Response::success().with("status", snapshot)
    }
}

/// Listens on the control socket and serves each client on its own thread.
pub struct CommandServer {
    socket_path: PathBuf,
    handler: Arc<CommandHandler>,
    running: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl CommandServer {
    pub fn new(socket_path: impl Into<PathBuf>, handler: Arc<CommandHandler>) -> Self {
        Self {
            socket_path: socket_path.into(),
            handler,
            running: Arc::new(AtomicBool::new(false)),
            accept_thread: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Binds the socket with owner-only permissions and starts accepting.
    pub fn start(&mut self) -> Result<(), DaemonError> {
        let bind_err = |source| DaemonError::Bind {
            path: self.socket_path.clone(),
            source,
        };

        match fs::remove_file(&self.socket_path) {
            Ok(()) => debug!("Removed stale socket {:?}", self.socket_path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(bind_err(err)),
        }

        let listener = UnixListener::bind(&self.socket_path).map_err(bind_err)?;
        fs::set_permissions(
            &self.socket_path,
            fs::Permissions::from_mode(PRIVATE_FILE_MODE),
        )
        .map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let handler = Arc::clone(&self.handler);
        let socket_path = self.socket_path.clone();
        self.accept_thread = Some(thread::spawn(move || {
            accept_loop(listener, &socket_path, handler, running);
        }));

        info!("Command server listening on {:?}", self.socket_path);
        Ok(())
    }

    /// Stops accepting and removes the socket file, then waits a bounded time
    /// for in-flight clients.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) && self.accept_thread.is_none() {
            return;
        }
        info!("Stopping command server");

        if let Some(handle) = self.accept_thread.take()
            && handle.join().is_err()
        {
            error!("Command server accept thread panicked");
        }

        remove_socket(&self.socket_path);
        info!("Command server stopped");
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn remove_socket(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed socket {path:?}"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => error!("Error removing socket file: {err}"),
    }
}

fn accept_loop(
    listener: UnixListener,
    socket_path: &Path,
    handler: Arc<CommandHandler>,
    running: Arc<AtomicBool>,
) {
    let mut clients: Vec<JoinHandle<()>> = Vec::new();

    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                clients.retain(|client| !client.is_finished());
                let handler = Arc::clone(&handler);
                clients.push(thread::spawn(move || serve_client(stream, &handler)));
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                error!("Error accepting connection: {err}");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
    drop(listener);
    remove_socket(socket_path);

    let deadline = Instant::now() + CLIENT_JOIN_TIMEOUT;
    for client in clients {
        while !client.is_finished() && Instant::now() < deadline {
            thread::sleep(ACCEPT_POLL_INTERVAL);
        }
        if client.is_finished() {
            let _ = client.join();
        } else {
            warn!("Abandoning client connection still in progress at shutdown");
        }
    }
}

fn serve_client(mut stream: UnixStream, handler: &CommandHandler) {
    if let Err(err) = stream
        .set_nonblocking(false)
        .and_then(|()| stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT)))
    {
        warn!("Failed to configure client connection: {err}");
        return;
    }

    let message = match ipc::read_message(&mut stream) {
        Ok(message) => message,
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) =>
        {
            debug!("Client connection timed out");
            return;
        }
        Err(err) => {
            warn!("Error reading from client: {err}");
            return;
        }
    };
    if message.iter().all(u8::is_ascii_whitespace) {
        return;
    }

    let response = match Request::parse(&message) {
        Ok(request) => handler.dispatch(request),
        Err(err) => {
            debug!("Rejected client request: {err}");
            Response::from(err)
        }
    };

    if let Err(err) = ipc::write_response(&mut stream, &response) {
        warn!("Error sending response: {err}");
    }
}
