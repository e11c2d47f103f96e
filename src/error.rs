//! Error types for Tether
//!
//! This module defines the error type shared by the launcher, the readiness
//! waiter and the request client.

use std::process::ExitStatus;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::server::ServerState;

/// Library-level errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to spawn server process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Server process exited before becoming ready: {status}")]
    ServerExited { status: ExitStatus },

    #[error("Server at {url} did not become ready within {waited:?}")]
    ReadyTimeout { url: String, waited: Duration },

    #[error("Invalid server state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: ServerState, to: ServerState },

    #[error("Server returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an upstream error from a non-success status and the raw body.
    ///
    /// OpenAI-compatible servers wrap failures as
    /// `{"error": {"message": ..., "type": ..., "code": ...}}`; when the body
    /// matches that envelope only the message is kept, otherwise the body is
    /// returned as-is.
    pub fn upstream(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.trim().to_string());

        Error::Upstream { status, message }
    }

    /// Whether the server rejected the request rather than failing to answer
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Upstream { status, .. } if (400..500).contains(status))
    }
}

/// OpenAI-style error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
