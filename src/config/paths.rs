//! Path management for recordbook
//!
//! ## Path Resolution Order
//!
//! 1. `RECORDBOOK_DATA_DIR` environment variable (if set)
//! 2. The platform configuration directory joined with `recordbook`
//!    (`~/.config/recordbook` on Linux, `%APPDATA%\recordbook` on Windows)

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::{RecordbookError, RecordbookResult};
use crate::models::RecordKind;
use crate::storage::BackendKind;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "RECORDBOOK_DATA_DIR";

const APP_DIR_NAME: &str = "recordbook";

/// Manages all paths used by recordbook
#[derive(Debug, Clone)]
pub struct RecordbookPaths {
    base_dir: PathBuf,
}

impl RecordbookPaths {
    /// Resolve the base directory from the environment or the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> RecordbookResult<Self> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => BaseDirs::new()
                .map(|dirs| dirs.config_dir().join(APP_DIR_NAME))
                .ok_or_else(|| {
                    RecordbookError::Config("Could not determine a home directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Use a fixed base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding one artifact per record kind
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Artifact for `kind` stored with `backend`, e.g. `data/todo.json`
    pub fn records_file(&self, kind: RecordKind, backend: BackendKind) -> PathBuf {
        self.data_dir()
            .join(format!("{}.{}", kind.as_str(), backend.extension()))
    }

    /// Create the base, data and backup directories
    pub fn ensure_directories(&self) -> RecordbookResult<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| RecordbookError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| RecordbookError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir()).map_err(|e| {
            RecordbookError::Io(format!("Failed to create backup directory: {}", e))
        })?;

        Ok(())
    }

    /// Whether `init` has written a settings file
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = RecordbookPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
    }

    #[test]
    fn test_records_file_per_kind_and_backend() {
        let paths = RecordbookPaths::with_base_dir(PathBuf::from("/srv/rb"));

        assert_eq!(
            paths.records_file(RecordKind::Contacts, BackendKind::Csv),
            PathBuf::from("/srv/rb/data/contacts.csv")
        );
        assert_eq!(
            paths.records_file(RecordKind::Todo, BackendKind::Json),
            PathBuf::from("/srv/rb/data/todo.json")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = RecordbookPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.backup_dir().exists());
        assert!(!paths.is_initialized());
    }
}
