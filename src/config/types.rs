use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    player::{IINA_BUNDLE_ID, PlayerTarget},
    tags::{CatalogEntry, TagCatalog},
};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Marker a helper script prints on stderr when the player has nothing open.
pub const DEFAULT_NO_FILE_MARKER: &str = "No video file";

/// Settings stored in `config.toml`.
///
/// Config keys (TOML): `poll_interval_ms`, `auto_refresh`, `player`, `tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    #[serde(default)]
    pub player: PlayerSettings,
    #[serde(default = "default_tags")]
    pub tags: Vec<CatalogEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            auto_refresh: true,
            player: PlayerSettings::default(),
            tags: default_tags(),
        }
    }
}

impl AppConfig {
    /// Clamp the poll interval and drop blank or duplicate tag names.
    pub(crate) fn normalized(self) -> Self {
        Self {
            poll_interval_ms: clamp_poll_interval_ms(self.poll_interval_ms),
            tags: TagCatalog::new(self.tags).entries().to_vec(),
            ..self
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(clamp_poll_interval_ms(self.poll_interval_ms))
    }

    pub fn catalog(&self) -> TagCatalog {
        TagCatalog::new(self.tags.clone())
    }

    pub fn set_catalog(&mut self, catalog: &TagCatalog) {
        self.tags = catalog.entries().to_vec();
    }
}

/// How the probe finds the file open in the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverKind {
    /// Inspect the player's open files with `lsof`.
    #[default]
    OpenFiles,
    /// Run a user-provided script that prints the path.
    HelperScript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSettings {
    #[serde(default = "default_bundle_id")]
    pub bundle_id: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub resolver: ResolverKind,
    /// Script run by the helper-script resolver. Defaults to
    /// `current-file.sh` in the app directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_script: Option<PathBuf>,
    #[serde(default = "default_no_file_markers")]
    pub no_file_markers: Vec<String>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            bundle_id: default_bundle_id(),
            app_name: default_app_name(),
            resolver: ResolverKind::default(),
            helper_script: None,
            no_file_markers: default_no_file_markers(),
        }
    }
}

impl PlayerSettings {
    pub fn target(&self) -> PlayerTarget {
        PlayerTarget {
            bundle_id: self.bundle_id.clone(),
            app_name: self.app_name.clone(),
        }
    }
}

pub(crate) fn clamp_poll_interval_ms(value: u64) -> u64 {
    value.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_tags() -> Vec<CatalogEntry> {
    TagCatalog::default().entries().to_vec()
}

fn default_bundle_id() -> String {
    IINA_BUNDLE_ID.to_string()
}

fn default_app_name() -> String {
    PlayerTarget::default().app_name
}

fn default_no_file_markers() -> Vec<String> {
    vec![DEFAULT_NO_FILE_MARKER.to_string()]
}
