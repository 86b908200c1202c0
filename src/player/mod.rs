//! Discovery of the file playing in the external media player.
//!
//! The player exposes no API for this, so the probe first checks that the
//! player process is alive, then asks a [`CurrentFileResolver`] backend to
//! recover the file path from the outside.

mod control;
mod liveness;
mod probe;
mod resolve;

pub use control::{ControlCommand, PlayerControl};
pub use liveness::{PlayerLocator, PlayerProcess, SystemLocator, read_bundle_identifier};
pub use probe::PlayerProbe;
pub use resolve::{CurrentFileResolver, HelperScriptResolver, OpenFilesResolver};

use thiserror::Error;

/// Bundle identifier of IINA, the default target player.
pub const IINA_BUNDLE_ID: &str = "com.colliderli.iina";

/// Extensions treated as playable media when scanning open files.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "mkv", "avi", "wmv", "flv", "webm", "mpg", "mpeg", "ts", "m2ts", "3gp",
    "ogv",
];

/// The application the probe looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTarget {
    pub bundle_id: String,
    /// Process name used when the bundle identifier cannot be read.
    pub app_name: String,
}

impl Default for PlayerTarget {
    fn default() -> Self {
        Self {
            bundle_id: IINA_BUNDLE_ID.to_string(),
            app_name: "IINA".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Player is not running")]
    PlayerNotRunning,
    #[error("No file currently playing")]
    NoFileLoaded,
    #[error("Failed to communicate with player: {0}")]
    ProbeCommunicationError(String),
    #[error("Invalid file path from player: {0}")]
    InvalidPath(String),
}

pub(crate) fn has_media_extension(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MEDIA_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
