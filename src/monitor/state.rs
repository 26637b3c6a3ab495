//! Client connection state machine.

use chrono::{DateTime, Utc};

/// Log marker emitted by Sunshine when a Moonlight client connects.
pub const CONNECTED_MARKER: &str = "CLIENT CONNECTED";
/// Log marker emitted by Sunshine when a Moonlight client disconnects.
pub const DISCONNECTED_MARKER: &str = "CLIENT DISCONNECTED";

/// Whether a streaming client is currently attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// A connection event found in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
}

impl ConnectionEvent {
    /// Classify a raw log line by substring.
    #[must_use]
    pub fn detect(line: &str) -> Option<Self> {
        if line.contains(CONNECTED_MARKER) {
            Some(Self::Connected)
        } else if line.contains(DISCONNECTED_MARKER) {
            Some(Self::Disconnected)
        } else {
            None
        }
    }

    /// State this event moves the machine into.
    #[must_use]
    pub fn target(self) -> ConnectionState {
        match self {
            Self::Connected => ConnectionState::Connected,
            Self::Disconnected => ConnectionState::Disconnected,
        }
    }
}

/// A state change produced by [`ConnectionStateMachine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub at: DateTime<Utc>,
}

/// Two-state machine that collapses repeated markers into single transitions.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    transitions: usize,
    ignored: usize,
    last_transition_at: Option<DateTime<Utc>>,
}

impl ConnectionStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Feed one event. Returns the transition, or `None` if the machine was
    /// already in the target state.
    pub fn apply(&mut self, event: ConnectionEvent) -> Option<Transition> {
        let to = event.target();
        if to == self.state {
            self.ignored = self.ignored.saturating_add(1);
            tracing::trace!(state = ?self.state, "Repeated marker ignored");
            return None;
        }

        let transition = Transition {
            from: self.state,
            to,
            at: Utc::now(),
        };
        tracing::debug!(from = ?transition.from, to = ?transition.to, "State transition");
        self.state = to;
        self.transitions = self.transitions.saturating_add(1);
        self.last_transition_at = Some(transition.at);
        Some(transition)
    }

    /// Number of genuine transitions so far.
    #[must_use]
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    /// Number of markers that matched the current state.
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    #[must_use]
    pub fn last_transition_at(&self) -> Option<DateTime<Utc>> {
        self.last_transition_at
    }
}
