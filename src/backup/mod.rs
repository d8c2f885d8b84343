//! Backup system for recordbook
//!
//! Provides timestamped copies of the record artifact with a count-based
//! retention policy, and restore functionality.
//!
//! # Architecture
//!
//! - `BackupManager`: creates, lists and prunes backups
//! - `RestoreManager`: validates and restores backups through the store
//!
//! # Backup Format
//!
//! A backup is a byte-for-byte copy of the artifact, named
//! `<artifact>.backup_<YYYYMMDD_HHMMSS>` in local time. Backups taken within
//! the same second get a `_1`, `_2`, ... suffix.
//!
//! # Example
//!
//! ```rust,ignore
//! use recordbook::backup::{BackupManager, RestoreManager};
//! use recordbook::config::BackupRetention;
//!
//! let manager = BackupManager::new(store.artifact_path().to_path_buf(), backup_dir, BackupRetention::default());
//! let (backup, report) = store.backup_with_retention(&manager)?;
//!
//! // Later, restore from backup
//! let result = RestoreManager::new(&store).restore(&backup.path)?;
//! println!("{}", result.summary());
//! ```

mod manager;
mod restore;

pub use manager::{BackupInfo, BackupManager, RetentionReport};
pub use restore::{RestoreManager, RestoreResult, ValidationResult};
