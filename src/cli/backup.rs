//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use clap::Subcommand;
use std::path::PathBuf;

use crate::backup::{BackupManager, RestoreManager};
use crate::display::backup::{format_backup_list, format_retention_report};
use crate::error::{RecordbookError, RecordbookResult};
use crate::storage::RecordStore;

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Create a new backup
    Create,

    /// List all available backups, newest first
    List,

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Check that a backup can be restored
    Verify {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Delete old backups according to retention policy
    Prune {
        /// Number of backups to keep (defaults to the configured maximum)
        #[arg(long)]
        keep: Option<usize>,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    store: &RecordStore,
    manager: &BackupManager,
    cmd: BackupCommands,
) -> RecordbookResult<()> {
    match cmd {
        BackupCommands::Create => {
            let (backup, report) = store.backup_with_retention(manager)?;
            println!("Backup created: {}", backup.filename);
            println!("Location: {}", backup.path.display());
            if !report.deleted.is_empty() || !report.failed.is_empty() {
                println!("{}", format_retention_report(&report));
            }
        }

        BackupCommands::List => {
            let backups = manager.list_backups()?;
            println!("{}", format_backup_list(&backups));
            if !backups.is_empty() {
                println!("Total: {} backup(s)", backups.len());
            }
        }

        BackupCommands::Restore { backup } => {
            let backup_path = resolve_backup_path(manager, &backup)?;
            let restore_manager = RestoreManager::new(store);

            let validation = restore_manager.validate_backup(&backup_path)?;
            if !validation.is_valid {
                return Err(RecordbookError::Backup(format!(
                    "{}: {}",
                    backup_path.display(),
                    validation.summary()
                )));
            }

            // Current data is kept as a backup of its own before it is replaced
            if store.artifact_path().exists() {
                let pre_restore = store.backup(manager)?;
                println!("Pre-restore backup saved: {}", pre_restore.filename);
            }

            let result = restore_manager.restore(&backup_path)?;
            println!("Restored from {}", backup_path.display());
            println!("{}", result.summary());
        }

        BackupCommands::Verify { backup } => {
            let backup_path = resolve_backup_path(manager, &backup)?;
            let validation = RestoreManager::new(store).validate_backup(&backup_path)?;

            println!("File: {}", backup_path.display());
            println!("Status: {}", validation.summary());

            if !validation.is_valid {
                return Err(RecordbookError::Backup(format!(
                    "{} is not a usable backup",
                    backup_path.display()
                )));
            }
        }

        BackupCommands::Prune { keep } => {
            let max_count = keep.unwrap_or(manager.retention().max_count);
            let report = manager.enforce_retention(max_count)?;
            println!("{}", format_retention_report(&report));
        }
    }

    Ok(())
}

/// Resolve a backup argument to a path
///
/// Accepts `latest`, a filename in the backup directory, or a path.
fn resolve_backup_path(manager: &BackupManager, backup: &str) -> RecordbookResult<PathBuf> {
    if backup == "latest" {
        return manager
            .get_latest_backup()?
            .map(|b| b.path)
            .ok_or_else(|| RecordbookError::backup_not_found("latest"));
    }

    if let Some(info) = manager.get_backup(backup)? {
        return Ok(info.path);
    }

    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    Err(RecordbookError::backup_not_found(backup))
}
