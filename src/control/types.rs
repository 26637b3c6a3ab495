//! Control channel message tokens.
//!
//! The channel speaks bare text frames, not JSON.

use std::fmt;

use crate::recorder::Command;

/// A command token accepted from control clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    StartRecording,
    StopRecording,
}

impl ControlRequest {
    /// Parse an inbound frame. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "start_recording" => Some(Self::StartRecording),
            "stop_recording" => Some(Self::StopRecording),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartRecording => "start_recording",
            Self::StopRecording => "stop_recording",
        }
    }

    /// Recorder command this request triggers.
    #[must_use]
    pub fn command(self) -> Command {
        match self {
            Self::StartRecording => Command::StartRecording,
            Self::StopRecording => Command::StopRecording,
        }
    }
}

/// A notification pushed to every control client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    RecordingStarted,
    RecordingStopped,
}

impl Notification {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecordingStarted => "recording_started",
            Self::RecordingStopped => "recording_stopped",
        }
    }

    /// Notification announced after `command`, if any.
    #[must_use]
    pub fn for_command(command: Command) -> Option<Self> {
        match command {
            Command::StartRecording => Some(Self::RecordingStarted),
            Command::StopRecording => Some(Self::RecordingStopped),
            Command::SaveReplayBuffer => None,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
