//! Control channel error types.

/// Errors that can occur running the control server.
#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server error.
    #[error("Control server error: {0}")]
    ServerError(#[from] std::io::Error),
}
