//! Backup restoration for recordbook
//!
//! Restores go through the store so the backup is decoded with the store's
//! backend, every record is re-validated, and the in-memory state is
//! replaced under the store's write lock.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{RecordbookError, RecordbookResult};
use crate::storage::RecordStore;

/// Handles restoring from backups
pub struct RestoreManager<'a> {
    store: &'a RecordStore,
}

impl<'a> RestoreManager<'a> {
    /// Create a new RestoreManager for `store`
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Validate a backup file without restoring it
    ///
    /// An unreadable or invalid backup is reported through the result rather
    /// than as an error; only a missing file is an error.
    pub fn validate_backup(&self, backup_path: &Path) -> RecordbookResult<ValidationResult> {
        if !backup_path.exists() {
            return Err(RecordbookError::backup_not_found(
                backup_path.display().to_string(),
            ));
        }

        let result = match self.store.check_snapshot_file(backup_path) {
            Ok(record_count) => ValidationResult {
                path: backup_path.to_path_buf(),
                is_valid: true,
                record_count,
                problem: None,
            },
            Err(e) => ValidationResult {
                path: backup_path.to_path_buf(),
                is_valid: false,
                record_count: 0,
                problem: Some(e.to_string()),
            },
        };

        Ok(result)
    }

    /// Replace the live records with the contents of a backup
    ///
    /// The id high-water mark never goes down, so ids retired after the
    /// backup was taken are not handed out again.
    pub fn restore(&self, backup_path: &Path) -> RecordbookResult<RestoreResult> {
        let validation = self.validate_backup(backup_path)?;
        if let Some(problem) = validation.problem {
            return Err(RecordbookError::Backup(format!(
                "Backup {} cannot be restored: {}",
                backup_path.display(),
                problem
            )));
        }

        let records_restored = self.store.replace_from_file(backup_path)?;
        let next_id = self.store.next_id()?;

        info!(
            backup = %backup_path.display(),
            records = records_restored,
            "restored backup"
        );

        Ok(RestoreResult {
            backup_path: backup_path.to_path_buf(),
            records_restored,
            next_id: next_id.as_u64(),
        })
    }
}

/// Result of validating a backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub path: PathBuf,
    pub is_valid: bool,
    /// Records in the backup (0 if invalid)
    pub record_count: usize,
    /// First problem found, if any
    pub problem: Option<String>,
}

impl ValidationResult {
    pub fn summary(&self) -> String {
        match &self.problem {
            None => format!("Valid backup with {} records", self.record_count),
            Some(problem) => format!("Invalid backup: {}", problem),
        }
    }
}

/// Result of a restore operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreResult {
    pub backup_path: PathBuf,
    pub records_restored: usize,
    /// High-water mark after the restore
    pub next_id: u64,
}

impl RestoreResult {
    pub fn summary(&self) -> String {
        format!(
            "Restored {} records; next id is #{}",
            self.records_restored, self.next_id
        )
    }
}
