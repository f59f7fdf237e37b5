//! Wire format of the control socket: one JSON request, one JSON response.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::VariantNames;
use thiserror::Error;

use crate::{config::ConfigPatch, constants::DEFAULT_LOG_TAIL};

/// Request sent by a client, tagged by its `cmd` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, VariantNames)]
#[serde(tag = "cmd", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Request {
    Ping,
    Status,
    SystemInfo,
    /// Kept as text so an unknown mode yields the friendly error message.
    Start {
        #[serde(default)]
        mode: String,
    },
    Stop,
    ConfigGet,
    ConfigSet(ConfigPatch),
    /// Full snapshot plus the newest `lines` log entries.
    Logs {
        #[serde(default = "default_log_tail")]
        lines: usize,
    },
}

fn default_log_tail() -> usize {
    DEFAULT_LOG_TAIL
}

/// Reasons a request could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Missing 'cmd' field")]
    MissingCommand,
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Request {
    /// Decodes a raw message, distinguishing malformed JSON, a missing or
    /// unknown command and ill-typed fields.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|err| ProtocolError::InvalidJson(err.to_string()))?;

        let cmd = match value.get("cmd") {
            Some(Value::String(cmd)) => cmd.clone(),
            Some(other) => other.to_string(),
            None => return Err(ProtocolError::MissingCommand),
        };
        if !Self::VARIANTS.contains(&cmd.as_str()) {
            return Err(ProtocolError::UnknownCommand(cmd));
        }

        serde_json::from_value(value).map_err(|err| ProtocolError::InvalidRequest(err.to_string()))
    }

    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::Status => "status",
            Request::SystemInfo => "system_info",
            Request::Start { .. } => "start",
            Request::Stop => "stop",
            Request::ConfigGet => "config_get",
            Request::ConfigSet(_) => "config_set",
            Request::Logs { .. } => "logs",
        }
    }
}

/// Reply to a single request: `ok`, an optional `error` and command-specific
/// fields at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Response {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
            payload: Map::new(),
        }
    }

    /// Successful response carrying a `message` field.
    pub fn message(message: impl Into<String>) -> Self {
        Self::success().with("message", message.into())
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            payload: Map::new(),
        }
    }

    /// Adds a payload field. Values that cannot be represented become `null`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.payload.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn message_text(&self) -> Option<&str> {
        self.get("message").and_then(Value::as_str)
    }
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        Response::failure(err.to_string())
    }
}
