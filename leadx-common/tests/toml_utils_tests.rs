//! Unit tests for TOML atomic write utilities
//!
//! Covers:
//! - Atomic file operations (temp + rename)
//! - Round-trip of every configured field
//! - Permissions 0600 on Unix

use leadx_common::config::{
    load_toml_config, write_atomic, write_toml_config, LocalModelConfig, LoggingConfig,
    TomlConfig,
};
#[cfg(unix)]
use leadx_common::config::check_toml_permissions_loose;
use std::path::PathBuf;
use tempfile::TempDir;

fn sample_config() -> TomlConfig {
    TomlConfig {
        google_maps_api_key: Some("gm-key".to_string()),
        openai_api_key: None,
        openai_model: Some("gpt-3.5-turbo".to_string()),
        audit_log: Some(PathBuf::from("/var/log/leadx/audit.log")),
        verbose_records: Some(5),
        logging: LoggingConfig::default(),
        local_model: LocalModelConfig::default(),
    }
}

#[test]
fn test_atomic_write_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    assert!(target.exists());
    assert!(!temp_dir.path().join("config.toml.tmp").exists());
}

#[test]
fn test_atomic_write_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");
    let config = sample_config();

    write_toml_config(&config, &target).unwrap();
    let loaded = load_toml_config(&target).unwrap();

    assert_eq!(loaded, config);
    let content = std::fs::read_to_string(&target).unwrap();
    assert!(content.contains("gm-key"));
    assert!(!content.contains("openai_api_key"), "None fields are omitted");
}

#[test]
fn test_atomic_write_replaces_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    let mut updated = sample_config();
    updated.google_maps_api_key = Some("rotated-key".to_string());
    write_toml_config(&updated, &target).unwrap();

    let loaded = load_toml_config(&target).unwrap();
    assert_eq!(loaded.google_maps_api_key.as_deref(), Some("rotated-key"));
    assert_eq!(loaded.verbose_records, Some(5));
}

#[test]
fn test_write_atomic_creates_parent_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("dir").join("data.json");

    write_atomic(&target, b"[]").unwrap();

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "[]");
}

#[cfg(unix)]
#[test]
fn test_written_config_is_owner_only() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    assert!(!check_toml_permissions_loose(&target).unwrap());
}

#[cfg(unix)]
#[test]
fn test_loose_permissions_detected() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");
    std::fs::write(&target, "").unwrap();
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644)).unwrap();

    assert!(check_toml_permissions_loose(&target).unwrap());
}

#[cfg(unix)]
#[test]
fn test_world_readable_config_with_keys_still_loads() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");
    write_toml_config(&sample_config(), &target).unwrap();
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644)).unwrap();

    let loaded = load_toml_config(&target).unwrap();

    assert!(loaded.holds_api_key());
    assert_eq!(loaded.google_maps_api_key.as_deref(), Some("gm-key"));
}
