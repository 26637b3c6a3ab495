//! In-memory backend for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{RecorderError, RecordingBackend, RequestOutcome};

#[derive(Debug, Default)]
struct Inner {
    connected: bool,
    requests: Vec<String>,
    failures: HashMap<String, (i64, String)>,
    delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

/// Records every request and answers from a script. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn connected() -> Self {
        let backend = Self::new();
        backend.inner.lock().unwrap().connected = true;
        backend
    }

    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().delay = delay;
        self
    }

    pub(crate) fn fail(&self, request_type: &str, code: i64, comment: &str) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert(request_type.to_string(), (code, comment.to_string()));
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub(crate) fn count(&self, request_type: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.as_str() == request_type)
            .count()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.inner.lock().unwrap().max_in_flight
    }
}

#[async_trait]
impl RecordingBackend for MockBackend {
    async fn connect(&mut self) -> Result<(), RecorderError> {
        self.inner.lock().unwrap().connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), RecorderError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(RecorderError::NotConnected);
        }
        inner.connected = false;
        Ok(())
    }

    async fn request(&mut self, request_type: &str) -> Result<RequestOutcome, RecorderError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.connected {
                return Err(RecorderError::NotConnected);
            }
            inner.requests.push(request_type.to_string());
            inner.in_flight += 1;
            inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
            inner.delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.in_flight -= 1;
        Ok(match inner.failures.get(request_type) {
            Some((code, comment)) => RequestOutcome::Failure {
                code: *code,
                comment: Some(comment.clone()),
            },
            None => RequestOutcome::Success,
        })
    }
}
