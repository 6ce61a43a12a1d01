//! Integration tests for ConfigManager and BuildSettings
//!
//! These tests verify:
//! - YAML keys as users write them map onto BuildSettings
//! - Missing keys fall back to defaults
//! - Output directory and log file resolution

use build_aosp_image::{BuildSettings, ConfigManager, UserConfig};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

fn manager_in(temp_dir: &TempDir) -> ConfigManager {
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    ConfigManager::new(root.join("config")).unwrap()
}

#[test]
fn test_load_full_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    fs::write(
        manager.settings_path(),
        r#"
Build_Settings:
  Output Dir: /srv/aosp/out
  Log File: build.log
  Factory Image Extension: zip
  Nested Archive Extension: zip
  Payload Extension: bin
  Debug Mode: true
"#,
    )
    .unwrap();

    let settings = manager.load_user_config().unwrap().build_settings;
    assert_eq!(settings.output_dir, "/srv/aosp/out");
    assert_eq!(settings.log_file, "build.log");
    assert_eq!(settings.payload_extension, "bin");
    assert!(settings.debug_mode);
}

#[test]
fn test_partial_settings_use_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    fs::write(manager.settings_path(), "Build_Settings:\n  Debug Mode: true\n").unwrap();

    let settings = manager.load_user_config().unwrap().build_settings;
    assert!(settings.debug_mode);
    assert_eq!(settings.log_file, "app.log");
    assert_eq!(settings.factory_image_extension, "zip");
    assert_eq!(settings.nested_archive_extension, "zip");
    assert_eq!(settings.payload_extension, "img");
    assert!(settings.output_dir.is_empty());
}

#[test]
fn test_empty_settings_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    fs::write(manager.settings_path(), "{}\n").unwrap();

    assert_eq!(manager.load_user_config().unwrap(), UserConfig::default());
}

#[test]
fn test_ensure_writes_loadable_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    assert!(manager.ensure_user_config().unwrap());

    let written = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(written.contains("Build_Settings"));
    assert!(written.contains("Log File"));
    assert_eq!(manager.load_user_config().unwrap(), UserConfig::default());
}

#[test]
fn test_path_resolution() {
    let base = Utf8Path::new("/opt/build-aosp-image");

    let defaults = BuildSettings::default();
    assert_eq!(defaults.resolve_output_dir(base), base);
    assert_eq!(defaults.resolve_log_file(base), base.join("app.log"));

    let configured = BuildSettings {
        output_dir: "/srv/out".to_string(),
        log_file: "/var/log/aosp.log".to_string(),
        ..BuildSettings::default()
    };
    assert_eq!(configured.resolve_output_dir(base), Utf8Path::new("/srv/out"));
    assert_eq!(
        configured.resolve_log_file(base),
        Utf8Path::new("/var/log/aosp.log")
    );
}
