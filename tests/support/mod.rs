//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sunshine_recorder::recorder::{RecorderError, RecordingBackend, RequestOutcome};

/// Backend that records request types. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    requests: Arc<Mutex<Vec<String>>>,
    connected: Arc<Mutex<bool>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, request_type: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.as_str() == request_type)
            .count()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }
}

#[async_trait]
impl RecordingBackend for RecordingLog {
    async fn connect(&mut self) -> Result<(), RecorderError> {
        *self.connected.lock().unwrap() = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), RecorderError> {
        *self.connected.lock().unwrap() = false;
        Ok(())
    }

    async fn request(&mut self, request_type: &str) -> Result<RequestOutcome, RecorderError> {
        if !self.is_connected() {
            return Err(RecorderError::NotConnected);
        }
        self.requests.lock().unwrap().push(request_type.to_string());
        Ok(RequestOutcome::Success)
    }
}

/// Append lines to a log file, creating it if needed.
pub fn append_lines(path: &Path, lines: &[&str]) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
