//! Control socket plumbing shared by the daemon and its clients.
use std::{
    fs,
    io::{self, Read, Write},
    net::Shutdown,
    os::unix::net::UnixStream,
    path::{Path, PathBuf},
    time::Duration,
};

use serde_json::Value;
use thiserror::Error;

use crate::{
    constants::MESSAGE_CEILING,
    protocol::{Request, Response},
    runtime::RuntimePaths,
};

/// Errors raised by the control channel helpers.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control socket I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialise control message: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("control socket not available at {0:?}; is the daemon running?")]
    NotAvailable(PathBuf),
    #[error("control message exceeds {MESSAGE_CEILING} bytes")]
    TooLarge,
}

/// Sends `request` to the daemon listening on `socket` and waits for the reply.
pub fn send_request(
    socket: &Path,
    request: &Request,
    timeout: Duration,
) -> Result<Response, ControlError> {
    if !socket.exists() {
        return Err(ControlError::NotAvailable(socket.to_path_buf()));
    }

    let mut stream = UnixStream::connect(socket).map_err(|err| match err.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => {
            ControlError::NotAvailable(socket.to_path_buf())
        }
        _ => ControlError::Io(err),
    })?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let payload = serde_json::to_vec(request)?;
    if payload.len() >= MESSAGE_CEILING {
        return Err(ControlError::TooLarge);
    }
    stream.write_all(&payload)?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    let _ = stream.shutdown(Shutdown::Write);

    let mut buf = Vec::new();
    stream
        .take(MESSAGE_CEILING as u64 + 1)
        .read_to_end(&mut buf)?;
    if buf.len() > MESSAGE_CEILING {
        return Err(ControlError::TooLarge);
    }
    if buf.iter().all(u8::is_ascii_whitespace) {
        return Err(ControlError::NotAvailable(socket.to_path_buf()));
    }

    Ok(serde_json::from_slice(&buf)?)
}

/// Reads one request from a client. Returns once the bytes received so far
/// form a JSON value, a newline arrives, the peer closes its side or the
/// message ceiling is reached.
pub fn read_message(stream: &mut UnixStream) -> io::Result<Vec<u8>> {
    let mut message = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        let room = MESSAGE_CEILING - message.len();
        message.extend_from_slice(&chunk[..read.min(room)]);

        if message.len() >= MESSAGE_CEILING
            || chunk[..read].contains(&b'\n')
            || serde_json::from_slice::<Value>(&message).is_ok()
        {
            break;
        }
    }

    if let Some(end) = message.iter().position(|b| *b == b'\n') {
        message.truncate(end);
    }
    Ok(message)
}

/// Writes a response to the connected client.
pub fn write_response(stream: &mut UnixStream, response: &Response) -> Result<(), ControlError> {
    let payload = serde_json::to_vec(response)?;
    stream.write_all(&payload)?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(())
}

/// Persists the daemon PID for later detection.
pub fn write_daemon_pid(paths: &RuntimePaths, pid: libc::pid_t) -> Result<(), ControlError> {
    fs::write(paths.pid_file(), pid.to_string())?;
    Ok(())
}

/// Reads the daemon PID if present.
pub fn read_daemon_pid(paths: &RuntimePaths) -> Result<Option<libc::pid_t>, ControlError> {
    let path = paths.pid_file();
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    contents
        .trim()
        .parse::<libc::pid_t>()
        .map(Some)
        .map_err(|e| ControlError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Removes the PID file and the socket.
pub fn cleanup_runtime(paths: &RuntimePaths) {
    for path in [paths.socket(), paths.pid_file()] {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
}
