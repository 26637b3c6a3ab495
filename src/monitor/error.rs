//! Monitor error types.

use std::path::PathBuf;

/// Errors that can occur while reading the Sunshine log.
#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    /// The log file does not exist (yet, or anymore).
    #[error("Log file not found: {0}")]
    FileMissing(PathBuf),

    /// Permission denied accessing the log file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
