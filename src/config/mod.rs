//! Persistent settings: poll interval, player probe options and the tag
//! catalog, stored as TOML in the app directory.

use crate::app_dirs;

mod errors;
mod legacy;
mod load;
mod save;
mod types;

#[cfg(test)]
mod tests;

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Tag catalog written by earlier releases, migrated on first load.
pub const LEGACY_TAGS_FILE_NAME: &str = "tags.json";
/// Helper script used when `player.helper_script` is unset.
pub const DEFAULT_HELPER_SCRIPT_NAME: &str = "current-file.sh";

pub use errors::ConfigError;
pub use load::{config_path, load_from_path, load_or_default};
pub use save::{save, save_to_path};
pub use types::{
    AppConfig, DEFAULT_NO_FILE_MARKER, DEFAULT_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS,
    MIN_POLL_INTERVAL_MS, PlayerSettings, ResolverKind,
};

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}

/// Resolve the helper script path, defaulting into the app directory.
pub fn helper_script_path(settings: &PlayerSettings) -> Result<std::path::PathBuf, ConfigError> {
    match &settings.helper_script {
        Some(path) => Ok(path.clone()),
        None => Ok(app_dirs::app_root_dir()
            .map_err(map_app_dir_error)?
            .join(DEFAULT_HELPER_SCRIPT_NAME)),
    }
}
