//! Local control channel.
//!
//! Other processes connect over WebSocket to observe and trigger recording.
//!
//! # Protocol
//!
//! Plain text frames:
//! - Client → bridge: `start_recording`, `stop_recording` (exact match,
//!   anything else is ignored)
//! - Bridge → clients: `recording_started`, `recording_stopped`
//!
//! Notifications are sent both for client requests and for transitions
//! detected in the Sunshine log.

mod error;
mod hub;
mod server;
mod types;

pub use error::ControlError;
pub use hub::{BroadcastHub, BroadcastReport, ClientId, CLIENT_QUEUE_CAPACITY};
pub use server::ControlServer;
pub use types::{ControlRequest, Notification};
