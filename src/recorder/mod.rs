//! Recording backend control.
//!
//! [`RecordingController`] is the only way the rest of the bridge talks to the
//! recording application. It owns a [`RecordingBackend`], serializes requests
//! against it, and turns error statuses into [`RecorderError`]s.
//!
//! [`ObsBackend`] implements the backend over OBS WebSocket v5:
//!
//! ```text
//! bridge                          OBS
//!   |------ connect ------------->|
//!   |<----- Hello (op 0) ---------|
//!   |------ Identify (op 1) ----->|
//!   |<----- Identified (op 2) ----|
//!   |------ Request (op 6) ------>|
//!   |<----- RequestResponse (7) --|
//! ```

mod controller;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod obs;
pub mod protocol;
mod types;

use async_trait::async_trait;

pub use controller::RecordingController;
pub use error::RecorderError;
pub use obs::ObsBackend;
pub use types::{Command, RequestOutcome};

/// A session with an external recording application.
///
/// Implementations hold at most one live session. Callers are expected to
/// serialize access; [`RecordingController`] does so with a mutex.
#[async_trait]
pub trait RecordingBackend: Send {
    /// Open and identify the session. A no-op when already connected.
    async fn connect(&mut self) -> Result<(), RecorderError>;

    /// Close the session if one is open.
    async fn disconnect(&mut self) -> Result<(), RecorderError>;

    /// Send a request and wait for its status.
    async fn request(&mut self, request_type: &str) -> Result<RequestOutcome, RecorderError>;
}
