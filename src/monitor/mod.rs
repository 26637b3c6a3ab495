//! Sunshine log monitoring.
//!
//! [`LogTailMonitor`] polls the log with a [`LogTailer`], classifies each new
//! line with [`ConnectionEvent::detect`], and feeds a
//! [`ConnectionStateMachine`]. Each genuine transition starts or stops the
//! recording through the [`BroadcastHub`], which also notifies control
//! clients.

mod error;
mod state;
mod tailer;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub use error::MonitorError;
pub use state::{
    ConnectionEvent, ConnectionState, ConnectionStateMachine, Transition, CONNECTED_MARKER,
    DISCONNECTED_MARKER,
};
pub use tailer::LogTailer;

use crate::config::{StartPosition, SunshineConfig};
use crate::control::BroadcastHub;
use crate::recorder::Command;

/// What a single poll saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Complete lines read.
    pub lines: usize,
    /// Lines that carried a connection marker.
    pub events: usize,
    /// Markers that changed the connection state.
    pub transitions: usize,
}

/// Tails the Sunshine log and drives recording from connection markers.
#[derive(Debug)]
pub struct LogTailMonitor {
    tailer: LogTailer,
    machine: ConnectionStateMachine,
    hub: Arc<BroadcastHub>,
    poll_interval: Duration,
    start_position: StartPosition,
}

impl LogTailMonitor {
    #[must_use]
    pub fn new(config: &SunshineConfig, hub: Arc<BroadcastHub>) -> Self {
        Self {
            tailer: LogTailer::new(config.log_path.clone()),
            machine: ConnectionStateMachine::new(),
            hub,
            poll_interval: config.poll_interval(),
            start_position: config.start_position,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    #[must_use]
    pub fn machine(&self) -> &ConnectionStateMachine {
        &self.machine
    }

    #[must_use]
    pub fn tailer(&self) -> &LogTailer {
        &self.tailer
    }

    /// Read newly appended lines and act on their markers.
    ///
    /// Side effects of each transition complete before the next line is
    /// examined.
    ///
    /// # Errors
    ///
    /// Returns the tailer's error; the cursor is unchanged in that case.
    pub async fn poll(&mut self) -> Result<PollReport, MonitorError> {
        let lines = self.tailer.read_new_lines().await?;
        let mut report = PollReport {
            lines: lines.len(),
            ..PollReport::default()
        };

        for line in &lines {
            let Some(event) = ConnectionEvent::detect(line) else {
                continue;
            };
            report.events += 1;

            if let Some(transition) = self.machine.apply(event) {
                report.transitions += 1;
                self.on_transition(transition).await;
            }
        }

        Ok(report)
    }

    async fn on_transition(&self, transition: Transition) {
        let command = match transition.to {
            ConnectionState::Connected => {
                tracing::info!("Moonlight client connected, starting recording");
                Command::StartRecording
            }
            ConnectionState::Disconnected => {
                tracing::info!("Moonlight client disconnected, stopping recording");
                Command::StopRecording
            }
        };

        if let Err(e) = self.hub.execute(command).await {
            tracing::warn!(command = %command, error = %e, "Recording command failed");
        }
    }

    /// Poll on the configured interval until `cancel` fires.
    ///
    /// Read failures are logged and retried on the next tick. Can be called
    /// again after it returns.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!(
            path = %self.tailer.path().display(),
            interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "Monitoring Sunshine log"
        );

        if self.start_position == StartPosition::End && self.tailer.offset() == 0 {
            if let Err(e) = self.tailer.seek_to_end().await {
                tracing::warn!(error = %e, "Could not skip existing log contents");
            }
        }

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!("Log monitor stopping");
                    break;
                }
                _ = interval.tick() => {}
            }

            match self.poll().await {
                Ok(report) if report.lines > 0 => {
                    tracing::trace!(
                        lines = report.lines,
                        events = report.events,
                        transitions = report.transitions,
                        offset = self.tailer.offset(),
                        "Polled log"
                    );
                }
                Ok(_) => {}
                Err(MonitorError::FileMissing(path)) => {
                    tracing::debug!(path = %path.display(), "Log file missing, skipping poll");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read log");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::control::Notification;
    use crate::recorder::mock::MockBackend;
    use crate::recorder::RecordingController;

    fn monitor(path: &std::path::Path, backend: &MockBackend) -> LogTailMonitor {
        let controller = RecordingController::new(backend.clone(), Duration::from_millis(200));
        let hub = Arc::new(BroadcastHub::new(Arc::new(controller)));
        let config = SunshineConfig {
            log_path: path.to_path_buf(),
            poll_interval_ms: 10,
            start_position: StartPosition::Beginning,
        };
        LogTailMonitor::new(&config, hub)
    }

    fn append(path: &std::path::Path, lines: &[&str]) {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
    }

    #[tokio::test]
    async fn test_connect_disconnect_connect_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        append(
            &path,
            &[
                "[10:00:00]: Info: CLIENT CONNECTED",
                "[10:05:00]: Info: CLIENT DISCONNECTED",
                "[10:06:00]: Info: CLIENT CONNECTED",
            ],
        );

        let backend = MockBackend::connected();
        let mut monitor = monitor(&path, &backend);
        let report = monitor.poll().await.unwrap();

        assert_eq!(report.transitions, 3);
        assert_eq!(backend.count("StartRecord"), 2);
        assert_eq!(backend.count("StopRecord"), 1);
        assert_eq!(monitor.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_repeated_markers_issue_one_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        append(&path, &["CLIENT CONNECTED", "noise", "CLIENT CONNECTED"]);

        let backend = MockBackend::connected();
        let mut monitor = monitor(&path, &backend);
        let report = monitor.poll().await.unwrap();
        assert_eq!(
            report,
            PollReport {
                lines: 3,
                events: 2,
                transitions: 1
            }
        );

        // Same marker again in a later poll is still a no-op.
        append(&path, &["CLIENT CONNECTED"]);
        monitor.poll().await.unwrap();
        assert_eq!(backend.requests(), vec!["StartRecord"]);
    }

    #[tokio::test]
    async fn test_polls_never_reread_consumed_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        append(&path, &["CLIENT CONNECTED"]);

        let backend = MockBackend::connected();
        let mut monitor = monitor(&path, &backend);
        monitor.poll().await.unwrap();
        let consumed = monitor.tailer().offset();

        let report = monitor.poll().await.unwrap();
        assert_eq!(report.lines, 0);
        assert_eq!(monitor.tailer().offset(), consumed);

        append(&path, &["CLIENT DISCONNECTED"]);
        let report = monitor.poll().await.unwrap();
        assert_eq!(report.lines, 1);
        assert!(monitor.tailer().offset() > consumed);
        assert_eq!(backend.requests(), vec!["StartRecord", "StopRecord"]);
    }

    #[tokio::test]
    async fn test_missing_file_leaves_cursor_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");

        let backend = MockBackend::connected();
        let mut monitor = monitor(&path, &backend);
        assert!(matches!(
            monitor.poll().await,
            Err(MonitorError::FileMissing(_))
        ));
        assert_eq!(monitor.tailer().offset(), 0);
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        append(&path, &["CLIENT CONNECTED"]);
        assert_eq!(monitor.poll().await.unwrap().transitions, 1);
    }

    #[tokio::test]
    async fn test_read_error_leaves_cursor_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        append(&path, &["CLIENT CONNECTED"]);

        let backend = MockBackend::connected();
        let mut monitor = monitor(&path, &backend);
        monitor.poll().await.unwrap();
        let consumed = monitor.tailer().offset();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(monitor.poll().await, Err(MonitorError::Io(_))));
        assert_eq!(monitor.tailer().offset(), consumed);
        assert_eq!(monitor.state(), ConnectionState::Connected);
        assert_eq!(backend.requests(), vec!["StartRecord"]);
    }

    #[tokio::test]
    async fn test_command_failure_does_not_block_state_machine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        append(&path, &["CLIENT CONNECTED"]);

        let backend = MockBackend::connected();
        backend.fail("StartRecord", 500, "boom");
        let mut monitor = monitor(&path, &backend);

        monitor.poll().await.unwrap();
        assert_eq!(monitor.state(), ConnectionState::Connected);

        append(&path, &["CLIENT DISCONNECTED"]);
        monitor.poll().await.unwrap();
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert_eq!(backend.requests(), vec!["StartRecord", "StopRecord"]);
    }

    #[tokio::test]
    async fn test_transitions_are_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        append(&path, &["CLIENT CONNECTED", "CLIENT DISCONNECTED"]);

        let backend = MockBackend::connected();
        let mut monitor = monitor(&path, &backend);
        let (_, mut rx) = monitor.hub.register().await;

        monitor.poll().await.unwrap();
        assert_eq!(rx.recv().await, Some(Notification::RecordingStarted));
        assert_eq!(rx.recv().await, Some(Notification::RecordingStopped));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        append(&path, &["CLIENT CONNECTED"]);

        let backend = MockBackend::connected();
        let mut monitor = monitor(&path, &backend);
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stopper.cancel();
        });

        tokio::time::timeout(Duration::from_secs(2), monitor.run(cancel))
            .await
            .expect("monitor should stop after cancel");

        assert_eq!(monitor.state(), ConnectionState::Connected);
        assert_eq!(backend.count("StartRecord"), 1);
    }

    #[tokio::test]
    async fn test_run_from_end_skips_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        append(&path, &["CLIENT CONNECTED", "CLIENT DISCONNECTED", "CLIENT CONNECTED"]);

        let backend = MockBackend::connected();
        let mut monitor = monitor(&path, &backend);
        monitor.start_position = StartPosition::End;

        let cancel = CancellationToken::new();
        cancel.cancel();
        monitor.run(cancel).await;

        assert_eq!(monitor.tailer().offset(), std::fs::metadata(&path).unwrap().len());
        assert!(backend.requests().is_empty());
    }
}
