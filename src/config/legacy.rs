use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{app_dirs, tags::CatalogEntry};

use super::{
    ConfigError, LEGACY_TAGS_FILE_NAME, map_app_dir_error, save::save_to_path, types::AppConfig,
};

pub(super) fn legacy_tags_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(LEGACY_TAGS_FILE_NAME))
}

/// One element of the old `tags.json` array.
#[derive(Debug, Deserialize)]
struct LegacyTag {
    name: String,
    #[serde(rename = "isEnabled", default = "enabled_by_default")]
    is_enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Build a config from a legacy tag list, writing it to `new_path`.
///
/// Without a legacy file this returns defaults and writes nothing.
pub(super) fn migrate_legacy_tags(
    legacy_path: &Path,
    new_path: &Path,
) -> Result<AppConfig, ConfigError> {
    if !legacy_path.exists() {
        return Ok(AppConfig::default());
    }
    let tags = load_legacy_from(legacy_path).map_err(|source| ConfigError::LegacyMigration {
        path: legacy_path.to_path_buf(),
        source: Box::new(source),
    })?;
    let config = AppConfig {
        tags: tags
            .into_iter()
            .map(|tag| CatalogEntry::new(tag.name, tag.is_enabled))
            .collect(),
        ..AppConfig::default()
    }
    .normalized();
    save_to_path(&config, new_path)?;
    backup_legacy_file(legacy_path)?;
    tracing::info!(
        "Migrated {} legacy tag(s) from {}",
        config.tags.len(),
        legacy_path.display()
    );
    Ok(config)
}

fn backup_legacy_file(path: &Path) -> Result<(), ConfigError> {
    let backup_path = path.with_extension("json.bak");
    if backup_path.exists() {
        std::fs::remove_file(&backup_path).map_err(|source| ConfigError::BackupLegacy {
            path: path.to_path_buf(),
            backup_path: backup_path.clone(),
            source,
        })?;
    }
    std::fs::rename(path, &backup_path).map_err(|source| ConfigError::BackupLegacy {
        path: path.to_path_buf(),
        backup_path,
        source,
    })
}

fn load_legacy_from(path: &Path) -> Result<Vec<LegacyTag>, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ConfigError::ParseJson {
        path: path.to_path_buf(),
        source,
    })
}
