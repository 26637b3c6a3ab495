//! Serialized command execution against the recording backend.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{Command, RecorderError, RecordingBackend, RequestOutcome};

/// Issues recording commands one at a time.
///
/// The backend sits behind a single async mutex, so every caller (log monitor,
/// control clients, console) waits for the in-flight request to finish before
/// its own is sent. Each request is bounded by the configured timeout.
pub struct RecordingController {
    backend: Mutex<Box<dyn RecordingBackend>>,
    timeout: Duration,
}

impl std::fmt::Debug for RecordingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingController")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RecordingController {
    /// Create a controller around a backend. Does not connect.
    pub fn new(backend: impl RecordingBackend + 'static, timeout: Duration) -> Self {
        Self {
            backend: Mutex::new(Box::new(backend)),
            timeout,
        }
    }

    /// Open the backend session.
    ///
    /// Failures are reported to the caller; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns the backend's connection or handshake error, or
    /// [`RecorderError::Timeout`].
    pub async fn connect(&self) -> Result<(), RecorderError> {
        let mut backend = self.backend.lock().await;
        self.bounded(backend.connect()).await?;
        tracing::info!("Connected to recording backend");
        Ok(())
    }

    /// Close the backend session, tolerating one that is already gone.
    ///
    /// # Errors
    ///
    /// Returns an error only if closing a live session fails.
    pub async fn disconnect(&self) -> Result<(), RecorderError> {
        let mut backend = self.backend.lock().await;
        match self.bounded(backend.disconnect()).await {
            Ok(()) | Err(RecorderError::NotConnected | RecorderError::ConnectionLost) => {
                tracing::info!("Disconnected from recording backend");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Start recording.
    ///
    /// # Errors
    ///
    /// See [`RecordingController::execute`].
    pub async fn start_recording(&self) -> Result<(), RecorderError> {
        self.execute(Command::StartRecording).await
    }

    /// Stop recording.
    ///
    /// # Errors
    ///
    /// See [`RecordingController::execute`].
    pub async fn stop_recording(&self) -> Result<(), RecorderError> {
        self.execute(Command::StopRecording).await
    }

    /// Flush the replay buffer to disk.
    ///
    /// # Errors
    ///
    /// See [`RecordingController::execute`].
    pub async fn save_replay_buffer(&self) -> Result<(), RecorderError> {
        self.execute(Command::SaveReplayBuffer).await
    }

    /// Send one command and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::CommandFailed`] when the backend reports an
    /// error status, [`RecorderError::Timeout`] when it does not answer in
    /// time, or a connection error when there is no usable session.
    pub async fn execute(&self, command: Command) -> Result<(), RecorderError> {
        let mut backend = self.backend.lock().await;
        let outcome = self
            .bounded(backend.request(command.request_type()))
            .await?;

        match outcome {
            RequestOutcome::Success => {
                tracing::info!(command = %command, "Recording command succeeded");
                Ok(())
            }
            RequestOutcome::Failure { code, comment } => Err(RecorderError::CommandFailed {
                command,
                code,
                comment,
            }),
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, RecorderError>
    where
        F: Future<Output = Result<T, RecorderError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| RecorderError::Timeout(self.timeout))?
    }
}
