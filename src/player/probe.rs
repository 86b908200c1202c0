use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use super::{CurrentFileResolver, PlayerLocator, PlayerTarget, ProbeError};

/// Answers "which file is the player showing right now?".
///
/// The last successfully resolved path is cached so callers can fall back
/// to it when a later probe fails.
pub struct PlayerProbe {
    target: PlayerTarget,
    locator: Arc<dyn PlayerLocator>,
    resolver: Arc<dyn CurrentFileResolver>,
    cached: Mutex<Option<PathBuf>>,
}

impl PlayerProbe {
    pub fn new(
        target: PlayerTarget,
        locator: Arc<dyn PlayerLocator>,
        resolver: Arc<dyn CurrentFileResolver>,
    ) -> Self {
        Self {
            target,
            locator,
            resolver,
            cached: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &PlayerTarget {
        &self.target
    }

    /// Resolve the current file. Blocks on the resolver subprocess.
    pub fn current_file(&self) -> Result<PathBuf, ProbeError> {
        let Some(process) = self.locator.find(&self.target) else {
            tracing::debug!("{} is not running", self.target.app_name);
            return Err(ProbeError::PlayerNotRunning);
        };
        let path = self.resolver.resolve_current_file(&process)?;
        if !path.exists() {
            return Err(ProbeError::InvalidPath(path.display().to_string()));
        }
        *self.cached.lock().unwrap_or_else(|err| err.into_inner()) = Some(path.clone());
        Ok(path)
    }

    /// The last path [`current_file`](Self::current_file) returned.
    pub fn cached_path(&self) -> Option<PathBuf> {
        self.cached
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn clear_cache(&self) {
        *self.cached.lock().unwrap_or_else(|err| err.into_inner()) = None;
    }
}
