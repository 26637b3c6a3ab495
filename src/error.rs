//! Top-level error type.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::control::ControlError;

/// Errors that stop the bridge. Everything else is logged and survived.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The Sunshine log must exist at launch.
    #[error("Sunshine log file not found: {0}")]
    LogFileMissing(PathBuf),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("Failed to start console listener: {0}")]
    Console(#[source] std::io::Error),
}
