//! Wiring and lifecycle of the whole bridge.

use std::io::BufReader;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::console::{dispatch_console_commands, help_line, spawn_console_listener};
use crate::control::{BroadcastHub, ControlServer};
use crate::error::BridgeError;
use crate::monitor::LogTailMonitor;
use crate::recorder::{Command, ObsBackend, RecordingBackend, RecordingController};

/// Console commands buffered before the listener thread blocks.
const CONSOLE_CHANNEL_CAPACITY: usize = 16;

/// Connects the Sunshine log, the recording backend and the control channel.
#[derive(Debug)]
pub struct Bridge {
    config: BridgeConfig,
}

impl Bridge {
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Run against OBS until `cancel` fires or a core task fails.
    ///
    /// # Errors
    ///
    /// See [`Bridge::run_with_backend`].
    pub async fn run(self, cancel: CancellationToken) -> Result<(), BridgeError> {
        let backend = ObsBackend::new(&self.config.obs)?;
        self.run_with_backend(backend, cancel).await
    }

    /// Run with the given recording backend.
    ///
    /// The log monitor and the control server run side by side; when either
    /// one stops, the other is cancelled and the backend session is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file is missing at launch, the control
    /// server cannot bind or fails, or the console thread cannot start.
    pub async fn run_with_backend<B>(self, backend: B, cancel: CancellationToken) -> Result<(), BridgeError>
    where
        B: RecordingBackend + 'static,
    {
        let config = self.config;

        if !tokio::fs::try_exists(&config.sunshine.log_path)
            .await
            .unwrap_or(false)
        {
            return Err(BridgeError::LogFileMissing(config.sunshine.log_path));
        }

        let controller = Arc::new(RecordingController::new(
            backend,
            config.obs.request_timeout(),
        ));
        if let Err(e) = controller.connect().await {
            tracing::error!(
                error = %e,
                "Could not connect to recording backend; commands will fail until restart"
            );
        }

        let hub = Arc::new(BroadcastHub::new(Arc::clone(&controller)));

        if config.recording.start_on_launch {
            tracing::info!("Starting recording on launch");
            if let Err(e) = hub.execute(Command::StartRecording).await {
                tracing::warn!(error = %e, "Launch recording failed");
            }
        }

        let server = ControlServer::bind(&config.control, Arc::clone(&hub)).await?;

        if config.console.enabled {
            let (tx, rx) = mpsc::channel(CONSOLE_CHANNEL_CAPACITY);
            spawn_console_listener(BufReader::new(std::io::stdin()), tx)
                .map_err(BridgeError::Console)?;
            tokio::spawn(dispatch_console_commands(rx, Arc::clone(&controller)));
            println!("Console: {}", help_line());
        }

        let mut monitor = LogTailMonitor::new(&config.sunshine, Arc::clone(&hub));

        let result = tokio::select! {
            () = monitor.run(cancel.clone()) => Ok(()),
            result = server.run(cancel.clone()) => result.map_err(BridgeError::from),
        };

        if !cancel.is_cancelled() {
            tracing::warn!("A core task exited, shutting down");
            cancel.cancel();
        }

        if let Err(e) = controller.disconnect().await {
            tracing::warn!(error = %e, "Failed to disconnect from recording backend");
        }
        tracing::info!(
            state = ?monitor.state(),
            transitions = monitor.machine().transitions(),
            "Bridge stopped"
        );

        result
    }
}
