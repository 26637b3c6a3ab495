//! Recorder error types.

use std::time::Duration;

use super::Command;

/// Errors reported by the recording controller and its backends.
#[derive(thiserror::Error, Debug)]
pub enum RecorderError {
    /// No live session; connect first or the previous one was lost.
    #[error("Recording backend not connected")]
    NotConnected,

    /// The transport could not be established.
    #[error("Failed to connect to recording backend: {0}")]
    Connection(String),

    /// Connected, but the identification handshake failed.
    #[error("Recording backend handshake failed: {0}")]
    Handshake(String),

    /// The session dropped while a request was outstanding.
    #[error("Recording backend connection lost")]
    ConnectionLost,

    /// The backend answered with an error status.
    #[error("{command} failed (code {code}){}", .comment.as_deref().map(|c| format!(": {c}")).unwrap_or_default())]
    CommandFailed {
        command: Command,
        code: i64,
        comment: Option<String>,
    },

    /// No response within the configured timeout.
    #[error("Recording backend did not respond within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A frame could not be encoded or decoded.
    #[error("Recording backend protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for RecorderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RecorderError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}
