use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// User configuration from `settings.yaml`
///
/// Contains the build settings; every field falls back to its default when
/// missing from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "Build_Settings", default)]
    pub build_settings: BuildSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Directory receiving working directories and artifacts.
    /// Empty means "next to the executable".
    #[serde(rename = "Output Dir", default)]
    pub output_dir: String,

    #[serde(rename = "Log File", default = "default_log_file")]
    pub log_file: String,

    #[serde(rename = "Factory Image Extension", default = "default_zip_extension")]
    pub factory_image_extension: String,

    #[serde(rename = "Nested Archive Extension", default = "default_zip_extension")]
    pub nested_archive_extension: String,

    #[serde(rename = "Payload Extension", default = "default_payload_extension")]
    pub payload_extension: String,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            output_dir: String::new(),
            log_file: default_log_file(),
            factory_image_extension: default_zip_extension(),
            nested_archive_extension: default_zip_extension(),
            payload_extension: default_payload_extension(),
            debug_mode: false,
        }
    }
}

impl BuildSettings {
    /// Effective output directory, using `fallback` when none is configured
    pub fn resolve_output_dir(&self, fallback: &Utf8Path) -> Utf8PathBuf {
        let configured = self.output_dir.trim();
        if configured.is_empty() {
            fallback.to_path_buf()
        } else {
            Utf8PathBuf::from(configured)
        }
    }

    /// Log file path; relative names are placed in `base_dir`
    pub fn resolve_log_file(&self, base_dir: &Utf8Path) -> Utf8PathBuf {
        let path = Utf8PathBuf::from(self.log_file.trim());
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }
}

fn default_log_file() -> String {
    "app.log".to_string()
}

fn default_zip_extension() -> String {
    "zip".to_string()
}

fn default_payload_extension() -> String {
    "img".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_settings_defaults() {
        let settings = BuildSettings::default();
        assert_eq!(settings.log_file, "app.log");
        assert_eq!(settings.factory_image_extension, "zip");
        assert_eq!(settings.nested_archive_extension, "zip");
        assert_eq!(settings.payload_extension, "img");
        assert!(!settings.debug_mode);
    }

    #[test]
    fn test_resolve_output_dir() {
        let mut settings = BuildSettings::default();
        let fallback = Utf8Path::new("/opt/build-aosp-image");
        assert_eq!(settings.resolve_output_dir(fallback), fallback);

        settings.output_dir = "  /srv/images ".to_string();
        assert_eq!(
            settings.resolve_output_dir(fallback),
            Utf8PathBuf::from("/srv/images")
        );
    }

    #[test]
    fn test_resolve_log_file_relative() {
        let settings = BuildSettings::default();
        assert_eq!(
            settings.resolve_log_file(Utf8Path::new("/opt/app")),
            Utf8PathBuf::from("/opt/app/app.log")
        );
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: UserConfig =
            serde_yaml_ng::from_str("Build_Settings:\n  Debug Mode: true\n").unwrap();
        assert!(config.build_settings.debug_mode);
        assert_eq!(config.build_settings.payload_extension, "img");
    }
}
