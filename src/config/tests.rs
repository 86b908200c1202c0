use std::path::{Path, PathBuf};

use tempfile::tempdir;

use super::*;
use crate::tags::{CatalogEntry, DEFAULT_TAG_NAMES};

fn with_config_home<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
    let _guard = crate::app_dirs::ConfigBaseGuard::set(dir.to_path_buf());
    f()
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    with_config_home(dir.path(), || {
        let config = load_or_default().unwrap();
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert!(config.auto_refresh);
        assert_eq!(config.player.bundle_id, "com.colliderli.iina");
        assert_eq!(config.player.resolver, ResolverKind::OpenFiles);
        let names = config
            .tags
            .iter()
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, DEFAULT_TAG_NAMES);
        assert!(!config_path().unwrap().exists());
    });
}

#[test]
fn saves_and_reloads_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let mut config = AppConfig {
        poll_interval_ms: 1_500,
        auto_refresh: false,
        ..AppConfig::default()
    };
    config.player.resolver = ResolverKind::HelperScript;
    config.player.helper_script = Some(PathBuf::from("/opt/iina-current.sh"));
    config.tags = vec![CatalogEntry::new("Arc", true), CatalogEntry::new("KP", false)];

    save_to_path(&config, &path).unwrap();
    let loaded = load_from_path(&path).unwrap();

    assert_eq!(loaded, config);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("resolver = \"helper-script\""), "{text}");
    assert!(text.contains("[[tags]]"), "{text}");
}

#[test]
fn save_leaves_no_temp_files_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    save_to_path(&AppConfig::default(), &path).unwrap();
    save_to_path(&AppConfig::default(), &path).unwrap();
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn clamps_poll_interval_and_dedupes_tags_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
poll_interval_ms = 10

[[tags]]
name = "Arc"

[[tags]]
name = " Arc "
enabled = false

[[tags]]
name = ""
"#,
    )
    .unwrap();

    let loaded = load_from_path(&path).unwrap();

    assert_eq!(loaded.poll_interval_ms, MIN_POLL_INTERVAL_MS);
    assert_eq!(loaded.tags, vec![CatalogEntry::new("Arc", true)]);
    assert_eq!(loaded.player, PlayerSettings::default());

    std::fs::write(&path, "poll_interval_ms = 999999\n").unwrap();
    assert_eq!(
        load_from_path(&path).unwrap().poll_interval_ms,
        MAX_POLL_INTERVAL_MS
    );
}

#[test]
fn invalid_toml_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "poll_interval_ms = \"fast\"").unwrap();
    assert!(matches!(
        load_from_path(&path),
        Err(ConfigError::ParseToml { .. })
    ));
}

#[test]
fn migrates_from_legacy_json() {
    let dir = tempdir().unwrap();
    with_config_home(dir.path(), || {
        let legacy_path = dir
            .path()
            .join(crate::app_dirs::APP_DIR_NAME)
            .join(LEGACY_TAGS_FILE_NAME);
        std::fs::create_dir_all(legacy_path.parent().unwrap()).unwrap();
        std::fs::write(
            &legacy_path,
            r#"[{"id":"1","name":"Arc","isEnabled":true},{"id":"2","name":"Custom","isEnabled":false}]"#,
        )
        .unwrap();

        let loaded = load_or_default().unwrap();

        assert_eq!(
            loaded.tags,
            vec![
                CatalogEntry::new("Arc", true),
                CatalogEntry::new("Custom", false)
            ]
        );
        let backup = legacy_path.with_extension("json.bak");
        assert!(backup.exists(), "expected backup file {}", backup.display());
        assert!(!legacy_path.exists());
        assert_eq!(load_from_path(&config_path().unwrap()).unwrap(), loaded);
    });
}

#[test]
fn broken_legacy_json_is_a_migration_error() {
    let dir = tempdir().unwrap();
    with_config_home(dir.path(), || {
        let legacy_path = dir
            .path()
            .join(crate::app_dirs::APP_DIR_NAME)
            .join(LEGACY_TAGS_FILE_NAME);
        std::fs::create_dir_all(legacy_path.parent().unwrap()).unwrap();
        std::fs::write(&legacy_path, "{not json").unwrap();

        let err = load_or_default().unwrap_err();
        assert!(matches!(err, ConfigError::LegacyMigration { .. }));
        assert!(legacy_path.exists());
    });
}

#[test]
fn helper_script_defaults_into_app_dir() {
    let dir = tempdir().unwrap();
    with_config_home(dir.path(), || {
        let default = helper_script_path(&PlayerSettings::default()).unwrap();
        assert_eq!(
            default,
            dir.path()
                .join(crate::app_dirs::APP_DIR_NAME)
                .join(DEFAULT_HELPER_SCRIPT_NAME)
        );
        let custom = PlayerSettings {
            helper_script: Some(PathBuf::from("/x/y.sh")),
            ..PlayerSettings::default()
        };
        assert_eq!(helper_script_path(&custom).unwrap(), PathBuf::from("/x/y.sh"));
    });
}
