//! Operator console.
//!
//! Reading stdin blocks, so the listener runs on its own OS thread and only
//! hands [`Command`] values to the runtime over a channel. Execution happens
//! in [`dispatch_console_commands`] on the runtime.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use crate::recorder::{Command, RecordingController};

/// A single-key console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleBinding {
    pub key: char,
    pub command: Command,
    pub action: &'static str,
}

pub const CONSOLE_BINDINGS: [ConsoleBinding; 2] = [
    ConsoleBinding {
        key: 'r',
        command: Command::SaveReplayBuffer,
        action: "save replay buffer",
    },
    ConsoleBinding {
        key: 's',
        command: Command::StopRecording,
        action: "stop recording",
    },
];

/// Map one line of console input to a command. Case and surrounding
/// whitespace are ignored.
#[must_use]
pub fn parse_console_command(input: &str) -> Option<Command> {
    let input = input.trim().to_lowercase();
    let mut chars = input.chars();
    let (Some(key), None) = (chars.next(), chars.next()) else {
        return None;
    };
    CONSOLE_BINDINGS
        .iter()
        .find(|binding| binding.key == key)
        .map(|binding| binding.command)
}

/// One-line summary of the console bindings.
#[must_use]
pub fn help_line() -> String {
    CONSOLE_BINDINGS
        .iter()
        .map(|binding| format!("[{}] {}", binding.key.bold(), binding.action))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Start reading commands from `input` on a dedicated thread.
///
/// The thread exits at end of input, on a read error, or once the receiving
/// side of `commands` is dropped.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_console_listener<R>(
    input: R,
    commands: mpsc::Sender<Command>,
) -> std::io::Result<thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("console-listener".into())
        .spawn(move || listen(input, &commands))
}

fn listen<R: BufRead>(input: R, commands: &mpsc::Sender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Console read failed, stopping listener");
                return;
            }
        };

        let Some(command) = parse_console_command(&line) else {
            if !line.trim().is_empty() {
                tracing::debug!(input = %line.trim(), "Unknown console command");
            }
            continue;
        };

        tracing::info!(command = %command, "Console command requested");
        if commands.blocking_send(command).is_err() {
            tracing::debug!("Command channel closed, stopping console listener");
            return;
        }
    }
    tracing::debug!("Console input closed");
}

/// Execute console commands on the runtime until the listener goes away.
///
/// There is no connection-state guard: `s` always attempts a stop.
pub async fn dispatch_console_commands(
    mut commands: mpsc::Receiver<Command>,
    controller: Arc<RecordingController>,
) {
    while let Some(command) = commands.recv().await {
        if let Err(e) = controller.execute(command).await {
            tracing::warn!(command = %command, error = %e, "Console command failed");
        }
    }
}
