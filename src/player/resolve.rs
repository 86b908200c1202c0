use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::process::CommandRunner;

use super::{PlayerProcess, ProbeError, has_media_extension};

/// Recovers the path of the file the player has open.
///
/// Implementations report [`ProbeError::NoFileLoaded`] when the player runs
/// idle. Validation that the path exists happens in the probe.
pub trait CurrentFileResolver: Send + Sync {
    fn resolve_current_file(&self, player: &PlayerProcess) -> Result<PathBuf, ProbeError>;
}

const LSOF: &str = "/usr/sbin/lsof";

/// Lists the player's open files with `lsof` and picks the first media file.
pub struct OpenFilesResolver {
    runner: Arc<dyn CommandRunner>,
}

impl OpenFilesResolver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl CurrentFileResolver for OpenFilesResolver {
    fn resolve_current_file(&self, player: &PlayerProcess) -> Result<PathBuf, ProbeError> {
        let args = ["-n", "-P", "-F", "n", "-p"]
            .into_iter()
            .map(str::to_string)
            .chain(std::iter::once(player.pid.to_string()))
            .collect::<Vec<_>>();
        let output = self
            .runner
            .run(LSOF, &args)
            .map_err(|err| ProbeError::ProbeCommunicationError(format!("lsof: {err}")))?;
        // lsof exits 1 with empty output when the pid vanished between the
        // liveness check and this call.
        if !output.is_success() && output.stdout.trim().is_empty() {
            let stderr = output.stderr.trim();
            return Err(if stderr.is_empty() {
                ProbeError::PlayerNotRunning
            } else {
                ProbeError::ProbeCommunicationError(stderr.to_string())
            });
        }
        open_media_files(&output.stdout)
            .next()
            .ok_or(ProbeError::NoFileLoaded)
    }
}

/// Absolute media paths from `lsof -F n` output, in listing order.
fn open_media_files(listing: &str) -> impl Iterator<Item = PathBuf> + '_ {
    listing
        .lines()
        .filter_map(|line| line.strip_prefix('n'))
        .map(Path::new)
        .filter(|path| path.is_absolute() && has_media_extension(path))
        .map(Path::to_path_buf)
}

const BASH: &str = "/bin/bash";

/// Runs a user-supplied script that prints the current file path.
///
/// A failing script is classified by its stderr: a "not running" message
/// means the player is gone, any configured marker means nothing is
/// loaded, anything else is a communication failure.
pub struct HelperScriptResolver {
    runner: Arc<dyn CommandRunner>,
    script: PathBuf,
    no_file_markers: Vec<String>,
}

impl HelperScriptResolver {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        script: impl Into<PathBuf>,
        no_file_markers: Vec<String>,
    ) -> Self {
        Self {
            runner,
            script: script.into(),
            no_file_markers,
        }
    }

    fn classify_failure(&self, stderr: &str) -> ProbeError {
        let lowered = stderr.to_lowercase();
        if lowered.contains("not running") {
            ProbeError::PlayerNotRunning
        } else if self
            .no_file_markers
            .iter()
            .any(|marker| !marker.is_empty() && stderr.contains(marker.as_str()))
        {
            ProbeError::NoFileLoaded
        } else {
            ProbeError::ProbeCommunicationError(stderr.trim().to_string())
        }
    }
}

impl CurrentFileResolver for HelperScriptResolver {
    fn resolve_current_file(&self, _player: &PlayerProcess) -> Result<PathBuf, ProbeError> {
        if !self.script.is_file() {
            return Err(ProbeError::ProbeCommunicationError(format!(
                "Helper script not found at {}",
                self.script.display()
            )));
        }
        let args = vec![self.script.to_string_lossy().into_owned()];
        let output = self
            .runner
            .run(BASH, &args)
            .map_err(|err| ProbeError::ProbeCommunicationError(err.to_string()))?;
        if !output.is_success() {
            return Err(self.classify_failure(&output.stderr));
        }
        let path = output.stdout.trim();
        if path.is_empty() {
            return Err(ProbeError::InvalidPath("helper script printed nothing".into()));
        }
        Ok(PathBuf::from(path))
    }
}
