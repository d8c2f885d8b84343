//! User settings for recordbook
//!
//! Manages the default record kind, storage backend, backup retention and
//! import behavior. Every field has a default so a partial or older
//! `config.json` still loads.

use serde::{Deserialize, Serialize};

use super::paths::RecordbookPaths;
use crate::error::{RecordbookError, RecordbookResult};
use crate::models::RecordKind;
use crate::storage::file_io::{read_json, write_json_atomic};
use crate::storage::BackendKind;

/// Backup retention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Number of most recent backups to keep
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

fn default_max_count() -> usize {
    5
}

impl Default for BackupRetention {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
        }
    }
}

/// User settings for recordbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Record kind used when `--kind` is not given
    #[serde(default)]
    pub default_kind: RecordKind,

    /// On-disk encoding for record artifacts
    #[serde(default)]
    pub backend: BackendKind,

    /// Backup retention policy
    #[serde(default)]
    pub backup_retention: BackupRetention,

    /// Take a backup after every mutating command
    #[serde(default)]
    pub auto_backup: bool,

    /// Abort an import on the first invalid entry
    #[serde(default)]
    pub strict_import: bool,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_kind: RecordKind::default(),
            backend: BackendKind::default(),
            backup_retention: BackupRetention::default(),
            auto_backup: false,
            strict_import: false,
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &RecordbookPaths) -> RecordbookResult<Self> {
        read_json(paths.settings_file())
            .map(Option::unwrap_or_default)
            .map_err(|e| RecordbookError::Config(format!("Failed to load settings: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &RecordbookPaths) -> RecordbookResult<()> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
            .map_err(|e| RecordbookError::Config(format!("Failed to save settings: {}", e)))
    }

    /// Change one setting by its dotted key
    pub fn set(&mut self, key: &str, value: &str) -> RecordbookResult<()> {
        let bad_value = || {
            RecordbookError::Config(format!("Invalid value '{}' for setting '{}'", value, key))
        };

        match key {
            "default_kind" => {
                self.default_kind = RecordKind::parse(value).ok_or_else(bad_value)?;
            }
            "backend" => {
                self.backend = BackendKind::parse(value).ok_or_else(bad_value)?;
            }
            "backup_retention.max_count" | "max_backups" => {
                self.backup_retention.max_count = value.parse().map_err(|_| bad_value())?;
            }
            "auto_backup" => {
                self.auto_backup = value.parse().map_err(|_| bad_value())?;
            }
            "strict_import" => {
                self.strict_import = value.parse().map_err(|_| bad_value())?;
            }
            _ => {
                return Err(RecordbookError::Config(format!(
                    "Unknown setting '{}'",
                    key
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_kind, RecordKind::Todo);
        assert_eq!(settings.backend, BackendKind::Json);
        assert_eq!(settings.backup_retention.max_count, 5);
        assert!(!settings.auto_backup);
        assert!(!settings.strict_import);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = RecordbookPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(Settings::load_or_create(&paths).unwrap(), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = RecordbookPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.default_kind = RecordKind::Contacts;
        settings.backend = BackendKind::Csv;
        settings.backup_retention.max_count = 2;
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = RecordbookPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"backend": "csv"}"#).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.backend, BackendKind::Csv);
        assert_eq!(loaded.backup_retention.max_count, 5);
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = RecordbookPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), "backend = csv").unwrap();

        assert!(matches!(
            Settings::load_or_create(&paths),
            Err(RecordbookError::Config(_))
        ));
    }

    #[test]
    fn test_set_by_key() {
        let mut settings = Settings::default();
        settings.set("backup_retention.max_count", "9").unwrap();
        settings.set("default_kind", "planner").unwrap();
        settings.set("auto_backup", "true").unwrap();

        assert_eq!(settings.backup_retention.max_count, 9);
        assert_eq!(settings.default_kind, RecordKind::Planner);
        assert!(settings.auto_backup);

        assert!(settings.set("backend", "sqlite").is_err());
        assert!(settings.set("colour", "blue").is_err());
    }
}
