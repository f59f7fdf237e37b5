//! onyxd supervises a single external CPU-mining worker on behalf of local
//! clients. It exposes a small JSON command protocol over a Unix socket,
//! starts the worker in one of two intensity modes, scrapes its output for
//! hashrate and errors, and tears it down cleanly on request or shutdown.

/// CLI interface.
pub mod cli;

/// Mining configuration and the generated worker configuration.
pub mod config;

/// Shared constants.
pub mod constants;

/// Worker process lifecycle.
pub mod controller;

/// Daemon orchestration.
pub mod daemon;

/// Error handling.
pub mod error;

/// Control socket client and framing helpers.
pub mod ipc;

/// Request and response types of the control protocol.
pub mod protocol;

/// Runtime directory layout.
pub mod runtime;

/// Command server.
pub mod server;

/// Supervisor state shared by the controller and the server.
pub mod state;

/// Host introspection.
pub mod system;

#[cfg(test)]
mod test_utils;
