use std::{sync::Arc, thread};

use crate::process::CommandRunner;

use super::PlayerTarget;

/// Playlist navigation sent to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Next,
    Previous,
}

impl ControlCommand {
    /// macOS virtual key code of the arrow key the player binds with Cmd.
    fn key_code(self) -> u16 {
        match self {
            ControlCommand::Next => 124,
            ControlCommand::Previous => 123,
        }
    }
}

/// Sends navigation keystrokes to the player through `osascript`.
#[derive(Clone)]
pub struct PlayerControl {
    runner: Arc<dyn CommandRunner>,
    target: PlayerTarget,
}

impl PlayerControl {
    pub fn new(runner: Arc<dyn CommandRunner>, target: PlayerTarget) -> Self {
        Self { runner, target }
    }

    /// Fire and forget; failures are only logged.
    pub fn send(&self, command: ControlCommand) {
        let control = self.clone();
        let spawned = thread::Builder::new()
            .name("vibetag-player-control".into())
            .spawn(move || control.send_blocking(command));
        if let Err(err) = spawned {
            tracing::warn!("Failed to spawn player control thread: {err}");
        }
    }

    pub(crate) fn send_blocking(&self, command: ControlCommand) {
        let args = vec![
            "-e".to_string(),
            control_script(&self.target.bundle_id, command),
        ];
        match self.runner.run("/usr/bin/osascript", &args) {
            Ok(output) if output.is_success() => {
                tracing::debug!("Sent {command:?} to {}", self.target.app_name);
            }
            Ok(output) => tracing::warn!(
                "Player control {command:?} failed: {}",
                output.stderr.trim()
            ),
            Err(err) => tracing::warn!("Player control {command:?} failed to launch: {err}"),
        }
    }
}

fn control_script(bundle_id: &str, command: ControlCommand) -> String {
    format!(
        "tell application id \"{}\" to activate\ndelay 0.2\ntell application \"System Events\" to key code {} using command down",
        applescript_escape(bundle_id),
        command.key_code()
    )
}

fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
