use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    player::{PlayerProbe, PlayerTarget, ProbeError},
    tags::{TagCatalog, TagSet, TagStore, TagStoreError},
};

use super::{
    FileInfo, SessionEvent, SessionSnapshot,
    jobs::{ProbeJobs, ProbeKind, ProbeReply},
    status::{self, StatusMessage},
};

/// Whether a probe is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling(ProbeKind),
    /// A cancelled probe has not replied yet; no new probe may start.
    Cancelling,
}

/// Result of asking the reconciler to start a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Started,
    /// A probe was already running.
    Skipped,
    /// Queued behind the running probe.
    Deferred,
    /// Auto-refresh is off.
    Disabled,
    /// The worker thread could not be spawned.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    NoActiveFile,
    NotInCatalog,
    Applied { name: String, enabled: bool },
    /// The stored tags could not be read or written; nothing changed.
    Reverted { name: String, reason: String },
}

/// Keeps the in-memory tag set in step with the player and the file.
///
/// The in-memory set always equals the stored tags of the active file
/// filtered by the enabled catalog, except while a toggle write is in
/// flight. All state lives on the owning thread; probes run on workers and
/// come back through [`pump`](Self::pump) or
/// [`wait_for_reply`](Self::wait_for_reply).
pub struct Reconciler {
    jobs: ProbeJobs,
    store: TagStore,
    catalog: TagCatalog,
    state: PollState,
    auto_refresh: bool,
    detection_requested: bool,
    last_detected: Option<PathBuf>,
    last_probe_error: Option<ProbeError>,
    active: Option<FileInfo>,
    tags: TagSet,
    events: Vec<SessionEvent>,
}

impl Reconciler {
    pub fn new(probe: Arc<PlayerProbe>, store: TagStore, catalog: TagCatalog) -> Self {
        Self {
            jobs: ProbeJobs::new(probe),
            store,
            catalog,
            state: PollState::Idle,
            auto_refresh: true,
            detection_requested: false,
            last_detected: None,
            last_probe_error: None,
            active: None,
            tags: TagSet::new(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn active_file(&self) -> Option<&FileInfo> {
        self.active.as_ref()
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn catalog(&self) -> &TagCatalog {
        &self.catalog
    }

    pub fn player(&self) -> &PlayerTarget {
        self.jobs.probe().target()
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        if self.auto_refresh != enabled {
            tracing::info!("Auto refresh {}", if enabled { "enabled" } else { "disabled" });
        }
        self.auto_refresh = enabled;
    }

    /// Replace the catalog and re-filter the active file's tags.
    pub fn set_catalog(&mut self, catalog: TagCatalog) {
        self.catalog = catalog;
        if let Some(path) = self.active.as_ref().map(|file| file.path.clone()) {
            self.refresh(&path);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            file: self.active.clone(),
            tags: self.tags.clone(),
            catalog: self.catalog.clone(),
            auto_refresh: self.auto_refresh,
            state: self.state,
        }
    }

    /// Events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Scheduled poll. Skipped while another probe is outstanding.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.auto_refresh {
            return TickOutcome::Disabled;
        }
        if self.state != PollState::Idle {
            tracing::trace!("Skipping tick; {:?}", self.state);
            return TickOutcome::Skipped;
        }
        self.start(ProbeKind::Scheduled)
    }

    /// Explicit detection. Deferred until a running probe completes.
    pub fn request_detection(&mut self) -> TickOutcome {
        if self.state != PollState::Idle {
            self.detection_requested = true;
            return TickOutcome::Deferred;
        }
        self.start(ProbeKind::Requested)
    }

    /// Probe on the calling thread with explicit-detection semantics.
    pub fn detect(&mut self) -> Option<FileInfo> {
        let result = self.jobs.probe().current_file();
        self.apply_detection(result);
        self.active.clone()
    }

    /// Apply every probe reply that has arrived. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(reply) = self.jobs.try_recv() {
            self.handle_reply(reply);
            handled += 1;
        }
        handled
    }

    /// Block up to `timeout` for one probe reply.
    pub fn wait_for_reply(&mut self, timeout: Duration) -> bool {
        match self.jobs.recv_timeout(timeout) {
            Some(reply) => {
                self.handle_reply(reply);
                true
            }
            None => false,
        }
    }

    /// Forget the in-flight probe. Its reply is dropped when it arrives,
    /// and no new probe starts before then.
    pub fn cancel(&mut self) {
        self.jobs.cancel_in_flight();
        if matches!(self.state, PollState::Polling(_)) {
            self.state = PollState::Cancelling;
        }
        self.detection_requested = false;
    }

    /// Make a user-chosen file the active one, independent of the player.
    ///
    /// A later poll only replaces it when the player reports a different
    /// file than the one it last reported.
    pub fn select_file(&mut self, path: PathBuf) -> Option<FileInfo> {
        if !path.exists() {
            let error = ProbeError::InvalidPath(path.display().to_string());
            tracing::info!("Manual selection rejected: {error}");
            let message = status::probe_failure(&error, &self.player().app_name);
            self.events.push(SessionEvent::Status(message));
            return None;
        }
        self.show(path, false, status::selected);
        self.active.clone()
    }

    /// Read the stored tags of `path`, filtered by the enabled catalog.
    ///
    /// Errors yield an empty set. When `path` is the active file the
    /// in-memory set is replaced.
    pub fn refresh(&mut self, path: &Path) -> TagSet {
        let tags = match self.store.read_tags(path) {
            Ok(stored) => self.catalog.filter(&stored),
            Err(error) => {
                tracing::warn!("Tag refresh failed: {error}");
                self.events
                    .push(SessionEvent::Status(status::read_failure(&error)));
                TagSet::new()
            }
        };
        if self.active.as_ref().is_some_and(|file| file.path == path) {
            self.tags = tags.clone();
            self.events.push(SessionEvent::TagsChanged {
                path: path.to_path_buf(),
                tags: tags.clone(),
            });
        }
        tags
    }

    /// Flip `name` on the active file and write the result immediately.
    pub fn toggle(&mut self, name: &str) -> ToggleOutcome {
        let Some(path) = self.active.as_ref().map(|file| file.path.clone()) else {
            tracing::debug!("Toggle of {name} ignored; no active file");
            return ToggleOutcome::NoActiveFile;
        };
        if !self.catalog.is_enabled(name) {
            tracing::debug!("Toggle of {name} ignored; not an enabled catalog tag");
            return ToggleOutcome::NotInCatalog;
        }

        let foreign = match self.foreign_tags(&path) {
            Ok(foreign) => foreign,
            Err(error) => {
                tracing::warn!("Toggle of {name} skipped; stored tags unreadable: {error}");
                self.events
                    .push(SessionEvent::Status(status::read_failure(&error)));
                return ToggleOutcome::Reverted {
                    name: name.to_string(),
                    reason: error.to_string(),
                };
            }
        };
        let enabled = self.tags.toggle(name);
        let persisted = self.tags.union(&foreign);
        match self.store.write_tags(&path, &persisted) {
            Ok(()) => {
                tracing::info!(
                    "{} {name} on {}",
                    if enabled { "Added" } else { "Removed" },
                    path.display()
                );
                self.events.push(SessionEvent::TagsChanged {
                    path,
                    tags: self.tags.clone(),
                });
                ToggleOutcome::Applied {
                    name: name.to_string(),
                    enabled,
                }
            }
            Err(error) => {
                self.tags.toggle(name);
                tracing::warn!("Tag write failed, reverted {name}: {error}");
                self.events
                    .push(SessionEvent::Status(status::write_failure(&error)));
                ToggleOutcome::Reverted {
                    name: name.to_string(),
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Stored tags the session does not manage; kept on every write.
    fn foreign_tags(&self, path: &Path) -> Result<TagSet, TagStoreError> {
        let stored = self.store.read_tags(path)?;
        Ok(stored
            .iter()
            .filter(|name| !self.catalog.is_enabled(name))
            .collect())
    }

    fn start(&mut self, kind: ProbeKind) -> TickOutcome {
        match self.jobs.spawn(kind) {
            Ok(()) => {
                self.state = PollState::Polling(kind);
                TickOutcome::Started
            }
            Err(err) => {
                tracing::warn!("Failed to spawn probe thread: {err}");
                TickOutcome::Failed
            }
        }
    }

    fn handle_reply(&mut self, reply: ProbeReply) {
        if self.jobs.is_current(&reply) {
            self.state = PollState::Idle;
            match reply.kind {
                ProbeKind::Scheduled => self.apply_poll(reply.result),
                ProbeKind::Requested => self.apply_detection(reply.result),
            }
        } else {
            tracing::debug!("Dropping {:?} probe reply from a cancelled run", reply.kind);
            if self.state != PollState::Cancelling {
                return;
            }
            self.state = PollState::Idle;
        }
        if std::mem::take(&mut self.detection_requested) {
            self.start(ProbeKind::Requested);
        }
    }

    fn apply_poll(&mut self, result: Result<PathBuf, ProbeError>) {
        match result {
            Ok(path) => {
                self.last_probe_error = None;
                if self.last_detected.as_ref() == Some(&path) {
                    return;
                }
                self.adopt(path, false);
            }
            Err(error) => {
                if let Some(previous) = self.last_detected.take() {
                    tracing::debug!("Lost track of {}: {error}", previous.display());
                }
                self.note_probe_failure(error);
            }
        }
    }

    fn apply_detection(&mut self, result: Result<PathBuf, ProbeError>) {
        match result {
            Ok(path) => {
                self.last_probe_error = None;
                self.adopt(path, false);
            }
            Err(error) => {
                tracing::info!("Detection failed: {error}");
                let message = status::probe_failure(&error, &self.player().app_name);
                self.events.push(SessionEvent::Status(message));
                self.last_probe_error = Some(error);
                let cached = self
                    .jobs
                    .probe()
                    .cached_path()
                    .filter(|path| path.exists());
                if let Some(path) = cached {
                    self.adopt(path, true);
                    // The next successful poll should replace the cached view.
                    self.last_detected = None;
                }
            }
        }
    }

    fn note_probe_failure(&mut self, error: ProbeError) {
        if self.last_probe_error.as_ref() == Some(&error) {
            return;
        }
        let message = status::probe_failure(&error, &self.player().app_name);
        self.events.push(SessionEvent::Status(message));
        self.last_probe_error = Some(error);
    }

    fn adopt(&mut self, path: PathBuf, cached: bool) {
        self.last_detected = Some(path.clone());
        self.show(path, cached, status::detected);
    }

    fn show(&mut self, path: PathBuf, cached: bool, message: fn(&FileInfo) -> StatusMessage) {
        let file = FileInfo::from_path(path.clone(), cached);
        tracing::info!(
            "Active file {} ({}){}",
            path.display(),
            file.size_label(),
            if cached { " [cached]" } else { "" }
        );
        self.active = Some(file.clone());
        self.tags = TagSet::new();
        self.events.push(SessionEvent::Status(message(&file)));
        self.events.push(SessionEvent::FileChanged(file));
        self.refresh(&path);
    }
}
