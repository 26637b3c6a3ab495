//! Recorder command and outcome types.

use std::fmt;

/// A request the bridge can issue against the recording backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    StartRecording,
    StopRecording,
    SaveReplayBuffer,
}

impl Command {
    /// OBS request type issued for this command.
    #[must_use]
    pub fn request_type(self) -> &'static str {
        match self {
            Self::StartRecording => "StartRecord",
            Self::StopRecording => "StopRecord",
            Self::SaveReplayBuffer => "SaveReplayBuffer",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.request_type())
    }
}

/// Result status of a single backend request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure { code: i64, comment: Option<String> },
}
