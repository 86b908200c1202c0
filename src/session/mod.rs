//! Session state: the active file, its tags, and the loop that keeps them
//! current.
//!
//! [`Reconciler`] holds the state and the rules. [`runtime`] drives a
//! reconciler on its own thread for long-running front ends.

mod file;
mod jobs;
mod reconciler;
pub mod runtime;
pub mod status;

pub use file::{FileInfo, format_size};
pub use jobs::ProbeKind;
pub use reconciler::{PollState, Reconciler, TickOutcome, ToggleOutcome};
pub use status::StatusMessage;

use std::path::PathBuf;

use crate::tags::{TagCatalog, TagSet};

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new active file was adopted; its tags follow in `TagsChanged`.
    FileChanged(FileInfo),
    TagsChanged { path: PathBuf, tags: TagSet },
    Status(StatusMessage),
    Snapshot(SessionSnapshot),
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub file: Option<FileInfo>,
    pub tags: TagSet,
    pub catalog: TagCatalog,
    pub auto_refresh: bool,
    pub state: PollState,
}
