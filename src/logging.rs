//! Tracing setup shared by the `vibetag` binaries.
//!
//! Each binary writes a timestamped log file per launch under the app
//! directory, named after itself, and keeps at most [`MAX_LOG_FILES`] of its
//! own. The session binary also echoes to stderr so stdout stays free for
//! its command output. `VIBETAG_LOG` takes `EnvFilter` directives.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::{app_dirs, config::AppConfig};

/// Maximum number of log files to retain per binary.
pub const MAX_LOG_FILES: usize = 10;
pub const FILTER_ENV: &str = "VIBETAG_LOG";
const DEFAULT_FILTER: &str = "warn,vibetag=info";

/// Which binary is logging and whether it echoes to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogTarget {
    pub binary: &'static str,
    pub console: bool,
}

/// The interactive session.
pub const SESSION: LogTarget = LogTarget {
    binary: "vibetag",
    console: true,
};

/// The one-shot tag tool; its stdout is the result, so it logs to file only.
pub const TAG_TOOL: LogTarget = LogTarget {
    binary: "vibetag-tags",
    console: false,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No suitable data directory available for logs")]
    NoDataDir,
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Initialize tracing for `target`.
///
/// Subsequent calls are no-ops. Callers should report the error and keep
/// running without logs rather than abort.
pub fn init(target: LogTarget) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let log_dir = app_dirs::logs_dir().map_err(|error| match error {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoDataDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            LoggingError::CreateDir { path, source }
        }
    })?;
    let log_file_name = format_log_file_name(target.binary, now_local_or_utc())?;
    let log_path = log_dir.join(&log_file_name);
    ensure_file_exists(&log_path)?;

    let file_appender = rolling::never(&log_dir, log_file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    prune_old_logs(&log_dir, target.binary, MAX_LOG_FILES)?;

    let timer = build_timer();
    let console_layer = target.console.then(|| {
        fmt::layer()
            .with_timer(timer.clone())
            .with_writer(std::io::stderr)
    });
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(file_writer);

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(console_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!(
        "{} {} logging to {}",
        target.binary,
        env!("CARGO_PKG_VERSION"),
        log_path.display()
    );
    Ok(())
}

/// Record the settings a session runs with, so a log file explains itself.
pub fn log_settings(config: &AppConfig) {
    let player = &config.player;
    tracing::info!(
        "Following {} ({}) via {:?}; poll {} ms, auto refresh {}",
        player.app_name,
        player.bundle_id,
        player.resolver,
        config.poll_interval_ms,
        if config.auto_refresh { "on" } else { "off" }
    );
    tracing::info!("Catalog: {}", enabled_catalog(config));
}

fn enabled_catalog(config: &AppConfig) -> String {
    let names = config.catalog().enabled_names().collect::<Vec<_>>().join(", ");
    if names.is_empty() {
        "(none enabled)".to_string()
    } else {
        names
    }
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove the oldest `<binary>_*.log` files beyond `max_files`.
fn prune_old_logs(dir: &Path, binary: &str, max_files: usize) -> Result<(), LoggingError> {
    let prefix = format!("{binary}_");
    let mut entries = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("log"))
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|(modified, _)| *modified);
    let excess = entries.len().saturating_sub(max_files);
    for (_, path) in entries.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn format_log_file_name(binary: &str, now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let name = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{binary}_{name}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    #[test]
    fn log_filename_is_named_after_the_binary() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = format_log_file_name(SESSION.binary, fixed).unwrap();
        assert_eq!(name, "vibetag_2023-11-14_22-13-20.log");
        let name = format_log_file_name(TAG_TOOL.binary, fixed).unwrap();
        assert_eq!(name, "vibetag-tags_2023-11-14_22-13-20.log");
    }

    #[test]
    fn prune_keeps_newest_files_of_one_binary() {
        let dir = tempdir().unwrap();
        for idx in 0..4 {
            ensure_file_exists(&dir.path().join(format!("vibetag_{idx}.log"))).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        ensure_file_exists(&dir.path().join("vibetag-tags_0.log")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        prune_old_logs(dir.path(), SESSION.binary, 2).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["notes.txt", "vibetag-tags_0.log", "vibetag_2.log", "vibetag_3.log"]
        );
    }

    #[test]
    fn catalog_summary_lists_enabled_tags() {
        let mut config = AppConfig::default();
        let mut catalog = config.catalog();
        catalog.set_enabled("KP", false);
        config.set_catalog(&catalog);
        assert_eq!(enabled_catalog(&config), "Arc, TMP, PRG, HW-SGR, RPLY, Other1");

        for name in ["Arc", "TMP", "PRG", "HW-SGR", "RPLY", "Other1"] {
            catalog.set_enabled(name, false);
        }
        config.set_catalog(&catalog);
        assert_eq!(enabled_catalog(&config), "(none enabled)");
    }
}
