//! Subscriber registry and notification fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use super::{ControlRequest, Notification};
use crate::recorder::{Command, RecorderError, RecordingController};

/// Identifier assigned to each control client.
pub type ClientId = Uuid;

/// Notifications queued per client before sends start failing.
pub const CLIENT_QUEUE_CAPACITY: usize = 32;

/// Delivery counts for one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Tracks connected control clients and runs their commands.
///
/// Each client gets a bounded queue; the connection task drains it onto the
/// socket. Enqueueing never blocks, so one slow or dead client cannot hold up
/// the others.
#[derive(Debug)]
pub struct BroadcastHub {
    controller: Arc<RecordingController>,
    clients: Mutex<HashMap<ClientId, mpsc::Sender<Notification>>>,
}

impl BroadcastHub {
    #[must_use]
    pub fn new(controller: Arc<RecordingController>) -> Self {
        Self {
            controller,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Add a client. The receiver yields every notification broadcast while
    /// the client stays registered.
    pub async fn register(&self) -> (ClientId, mpsc::Receiver<Notification>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        let mut clients = self.clients.lock().await;
        clients.insert(id, tx);
        tracing::info!(client = %id, clients = clients.len(), "Control client connected");
        (id, rx)
    }

    /// Remove a client. Returns whether it was registered.
    pub async fn unregister(&self, id: ClientId) -> bool {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(&id).is_some();
        if removed {
            tracing::info!(client = %id, clients = clients.len(), "Control client disconnected");
        }
        removed
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Queue `notification` for every registered client.
    ///
    /// A failed enqueue is logged and counted; the client stays registered.
    pub async fn broadcast(&self, notification: Notification) -> BroadcastReport {
        let clients = self.clients.lock().await;
        let mut report = BroadcastReport::default();

        for (id, tx) in clients.iter() {
            match tx.try_send(notification) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        client = %id,
                        notification = %notification,
                        error = %e,
                        "Failed to send notification to control client"
                    );
                }
            }
        }

        tracing::debug!(
            notification = %notification,
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast notification"
        );
        report
    }

    /// Run `command`, then announce it to all clients.
    ///
    /// The announcement goes out whether or not the backend accepted the
    /// command; the result is returned for the caller to log.
    ///
    /// # Errors
    ///
    /// Returns the controller's error for the command.
    pub async fn execute(&self, command: Command) -> Result<(), RecorderError> {
        let result = self.controller.execute(command).await;
        if let Some(notification) = Notification::for_command(command) {
            self.broadcast(notification).await;
        }
        result
    }

    /// Handle a parsed control-client request.
    ///
    /// # Errors
    ///
    /// See [`BroadcastHub::execute`].
    pub async fn handle_request(&self, request: ControlRequest) -> Result<(), RecorderError> {
        tracing::info!(request = request.as_str(), "Control client request");
        self.execute(request.command()).await
    }
}
