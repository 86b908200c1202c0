use std::path::{Path, PathBuf};

use crate::app_dirs;

use super::{
    CONFIG_FILE_NAME, ConfigError, legacy, map_app_dir_error, types::AppConfig,
};

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from disk, returning defaults if missing.
///
/// If no `config.toml` exists but a legacy `tags.json` does, its catalog is
/// migrated into a new TOML file and the JSON is backed up.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    let path = config_path()?;
    if path.exists() {
        return load_from_path(&path);
    }
    let legacy_path = legacy::legacy_tags_path()?;
    legacy::migrate_legacy_tags(&legacy_path, &path)
}

/// Parse a TOML settings file, normalizing out-of-range values.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    let normalized = config.normalized();
    tracing::debug!(
        "Loaded config from {} ({} tags, poll {} ms)",
        path.display(),
        normalized.tags.len(),
        normalized.poll_interval_ms
    );
    Ok(normalized)
}
