//! User-facing status lines for session outcomes.

use crate::{player::ProbeError, tags::TagStoreError};

use super::FileInfo;

/// A status line for the presentation layer.
///
/// Persistent messages need user action and should stay visible until the
/// next successful operation replaces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub persistent: bool,
}

impl StatusMessage {
    fn transient(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            persistent: false,
        }
    }
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

pub fn detected(file: &FileInfo) -> StatusMessage {
    if file.cached {
        StatusMessage::transient(format!("Using last known file: {}", file.display_name))
    } else {
        StatusMessage::transient(format!("Detected: {}", file.display_name))
    }
}

pub fn selected(file: &FileInfo) -> StatusMessage {
    StatusMessage::transient(format!("File selected manually: {}", file.display_name))
}

pub fn probe_failure(error: &ProbeError, app_name: &str) -> StatusMessage {
    StatusMessage::transient(match error {
        ProbeError::PlayerNotRunning => format!("{app_name} is not running"),
        ProbeError::NoFileLoaded => format!("No file playing in {app_name}"),
        ProbeError::ProbeCommunicationError(detail) => {
            format!("Could not query {app_name}: {detail}")
        }
        ProbeError::InvalidPath(path) => format!("File not found: {path}"),
    })
}

pub fn read_failure(error: &TagStoreError) -> StatusMessage {
    StatusMessage::transient(format!("Could not read tags: {error}"))
}

pub fn write_failure(error: &TagStoreError) -> StatusMessage {
    StatusMessage {
        text: format!(
            "Could not save tags ({error}). Grant VibeTag Full Disk Access in System Settings > Privacy & Security, then try again."
        ),
        persistent: true,
    }
}
