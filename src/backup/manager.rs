//! Backup manager for recordbook
//!
//! Copies the live record artifact into timestamped siblings in the backup
//! directory and prunes old copies by count.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::settings::BackupRetention;
use crate::error::{RecordbookError, RecordbookResult};

/// Separator between the artifact name and the timestamp
const BACKUP_MARKER: &str = ".backup_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;

/// Metadata about a backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// Local time embedded in the filename
    pub created_at: NaiveDateTime,
    /// Disambiguating suffix for backups taken within the same second
    pub sequence: u32,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Outcome of a retention sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Backups left in place
    pub kept: usize,
    /// Backups removed (or already gone)
    pub deleted: Vec<PathBuf>,
    /// Backups that could not be removed, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Manages backup creation and retention
pub struct BackupManager {
    /// The artifact being backed up
    source: PathBuf,
    /// Path to backup directory
    backup_dir: PathBuf,
    /// Retention policy
    retention: BackupRetention,
    /// Serializes backups taken through this manager
    naming: Mutex<()>,
}

impl BackupManager {
    /// Create a new BackupManager for the artifact at `source`
    pub fn new(source: PathBuf, backup_dir: PathBuf, retention: BackupRetention) -> Self {
        Self {
            source,
            backup_dir,
            retention,
            naming: Mutex::new(()),
        }
    }

    /// Get backup directory path
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn retention(&self) -> &BackupRetention {
        &self.retention
    }

    fn source_name(&self) -> RecordbookResult<String> {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                RecordbookError::Backup(format!("Invalid source path: {}", self.source.display()))
            })
    }

    /// Copy the current artifact into a new backup
    ///
    /// Existing backups are never overwritten; a second backup within the same
    /// second gets a `_1`, `_2`, ... suffix.
    pub fn create_backup(&self) -> RecordbookResult<BackupInfo> {
        let _naming = self
            .naming
            .lock()
            .map_err(|e| RecordbookError::Backup(format!("Failed to acquire backup lock: {}", e)))?;

        if !self.source.exists() {
            return Err(RecordbookError::Backup(format!(
                "Nothing to back up: {} does not exist",
                self.source.display()
            )));
        }

        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            RecordbookError::Backup(format!("Failed to create backup directory: {}", e))
        })?;

        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let base = format!("{}{}{}", self.source_name()?, BACKUP_MARKER, stamp);
        let temp = self
            .backup_dir
            .join(format!(".{}.{}.tmp", base, std::process::id()));

        let finalized = copy_verified(&self.source, &temp)
            .and_then(|()| link_unique(&temp, &self.backup_dir, &base));
        let _ = fs::remove_file(&temp);
        let target = finalized?;

        let info = self.parse_backup_info(&target).ok_or_else(|| {
            RecordbookError::Backup(format!(
                "Backup {} was not readable after write",
                target.display()
            ))
        })?;

        info!(backup = %info.filename, bytes = info.size_bytes, "created backup");
        Ok(info)
    }

    /// List all backups of the artifact, newest first
    pub fn list_backups(&self) -> RecordbookResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir).map_err(|e| {
            RecordbookError::Backup(format!("Failed to read backup directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                RecordbookError::Backup(format!("Failed to read directory entry: {}", e))
            })?;

            if let Some(info) = self.parse_backup_info(&entry.path()) {
                backups.push(info);
            }
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.sequence.cmp(&a.sequence))
        });

        Ok(backups)
    }

    /// Parse backup info from a backup filename; `None` for unrelated files
    fn parse_backup_info(&self, path: &Path) -> Option<BackupInfo> {
        let filename = path.file_name()?.to_string_lossy().into_owned();
        let source_name = self.source_name().ok()?;

        let suffix = filename
            .strip_prefix(source_name.as_str())?
            .strip_prefix(BACKUP_MARKER)?;
        let (created_at, sequence) = parse_backup_suffix(suffix)?;

        let size_bytes = fs::metadata(path).ok()?.len();

        Some(BackupInfo {
            filename,
            path: path.to_path_buf(),
            created_at,
            sequence,
            size_bytes,
        })
    }

    /// Keep the `max_count` newest backups and delete the rest
    ///
    /// A deletion failure is logged and reported; the sweep carries on with
    /// the remaining backups.
    pub fn enforce_retention(&self, max_count: usize) -> RecordbookResult<RetentionReport> {
        let backups = self.list_backups()?;
        let mut report = RetentionReport {
            kept: backups.len().min(max_count),
            ..Default::default()
        };

        for backup in backups.into_iter().skip(max_count) {
            match remove_backup(&backup.path) {
                Ok(()) => {
                    info!(backup = %backup.filename, "deleted old backup");
                    report.deleted.push(backup.path);
                }
                Err(e) => {
                    warn!(backup = %backup.filename, error = %e, "failed to delete old backup");
                    report.failed.push((backup.path, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Create a backup and then enforce the configured retention policy
    pub fn create_backup_with_retention(&self) -> RecordbookResult<(BackupInfo, RetentionReport)> {
        let backup = self.create_backup()?;
        let report = self.enforce_retention(self.retention.max_count)?;
        Ok((backup, report))
    }

    /// Get a specific backup by filename
    pub fn get_backup(&self, filename: &str) -> RecordbookResult<Option<BackupInfo>> {
        let path = self.backup_dir.join(filename);
        if path.exists() {
            Ok(self.parse_backup_info(&path))
        } else {
            Ok(None)
        }
    }

    /// Get the most recent backup
    pub fn get_latest_backup(&self) -> RecordbookResult<Option<BackupInfo>> {
        let backups = self.list_backups()?;
        Ok(backups.into_iter().next())
    }
}

/// Copy `source` to `temp`, check the length, then sync
fn copy_verified(source: &Path, temp: &Path) -> RecordbookResult<()> {
    let expected = fs::metadata(source)
        .map_err(|e| RecordbookError::Backup(format!("Failed to read source: {}", e)))?
        .len();

    let copied = fs::copy(source, temp)
        .map_err(|e| RecordbookError::Backup(format!("Failed to copy data: {}", e)))?;

    if copied != expected {
        return Err(RecordbookError::Backup(format!(
            "Backup copy is incomplete ({} of {} bytes)",
            copied, expected
        )));
    }

    File::open(temp)
        .and_then(|f| f.sync_all())
        .map_err(|e| RecordbookError::Backup(format!("Failed to sync backup: {}", e)))
}

/// Publish `temp` as `dir/base`, or `dir/base_<n>` for the first free `n`
///
/// A hard link fails instead of replacing an existing file, so a backup
/// written by another process under the same name is left alone.
fn link_unique(temp: &Path, dir: &Path, base: &str) -> RecordbookResult<PathBuf> {
    let mut sequence = 0u32;
    loop {
        let filename = match sequence {
            0 => base.to_string(),
            n => format!("{}_{}", base, n),
        };
        let target = dir.join(&filename);

        match fs::hard_link(temp, &target) {
            Ok(()) => return Ok(target),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                sequence = sequence.checked_add(1).ok_or_else(|| {
                    RecordbookError::Backup(format!("No free backup name for {}", base))
                })?;
            }
            Err(e) => {
                return Err(RecordbookError::Backup(format!(
                    "Failed to finalize backup: {}",
                    e
                )))
            }
        }
    }
}

/// Remove one backup; a file that is already gone counts as removed
fn remove_backup(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Parse `YYYYMMDD_HHMMSS` with an optional `_<n>` suffix
fn parse_backup_suffix(suffix: &str) -> Option<(NaiveDateTime, u32)> {
    let stamp = suffix.get(..TIMESTAMP_LEN)?;
    let created_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;

    let sequence = match &suffix[TIMESTAMP_LEN..] {
        "" => 0,
        rest => rest.strip_prefix('_')?.parse().ok()?,
    };

    Some((created_at, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use tempfile::TempDir;

    fn create_test_manager(max_count: usize) -> (BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("data").join("todo.json");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, r#"{"records": []}"#).unwrap();

        let manager = BackupManager::new(
            source,
            temp_dir.path().join("backups"),
            BackupRetention { max_count },
        );
        (manager, temp_dir)
    }

    #[test]
    fn test_create_backup() {
        let (manager, _temp) = create_test_manager(5);

        let backup = manager.create_backup().unwrap();
        assert!(backup.path.exists());
        assert!(backup.filename.starts_with("todo.json.backup_"));
        assert_eq!(
            fs::read(&backup.path).unwrap(),
            br#"{"records": []}"#.to_vec()
        );
    }

    #[test]
    fn test_same_second_backups_get_suffixes() {
        let (manager, _temp) = create_test_manager(5);

        let backups: Vec<_> = (0..3).map(|_| manager.create_backup().unwrap()).collect();

        let mut names: Vec<_> = backups.iter().map(|b| b.filename.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
        assert_eq!(manager.list_backups().unwrap().len(), 3);
    }

    #[test]
    fn test_backup_never_replaces_an_existing_file() {
        let (manager, _temp) = create_test_manager(5);
        let first = manager.create_backup().unwrap();

        // Another writer already holds the next free name
        let base = first.filename.clone();
        let taken = manager.backup_dir().join(format!("{}_1", base));
        fs::write(&taken, b"written elsewhere").unwrap();

        let dir = manager.backup_dir().to_path_buf();
        let staged = dir.join(".staged.tmp");
        fs::write(&staged, b"newer").unwrap();

        let published = link_unique(&staged, &dir, &base).unwrap();
        assert_eq!(published, dir.join(format!("{}_2", base)));
        assert_eq!(fs::read(&published).unwrap(), b"newer".to_vec());
        assert_eq!(fs::read(&taken).unwrap(), b"written elsewhere".to_vec());
        assert_eq!(
            fs::read(&first.path).unwrap(),
            br#"{"records": []}"#.to_vec()
        );
    }

    #[test]
    fn test_create_backup_leaves_no_temp_files() {
        let (manager, _temp) = create_test_manager(5);
        manager.create_backup().unwrap();
        manager.create_backup().unwrap();

        let hidden = fs::read_dir(manager.backup_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .count();
        assert_eq!(hidden, 0);
    }

    #[test]
    fn test_list_backups_newest_first() {
        let (manager, _temp) = create_test_manager(5);
        let first = manager.create_backup().unwrap();
        let second = manager.create_backup().unwrap();

        let listed = manager.list_backups().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(
            (listed[0].created_at, listed[0].sequence) >= (listed[1].created_at, listed[1].sequence)
        );
        assert_eq!(listed[0], second);
        assert_eq!(listed[1], first);
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let (manager, _temp) = create_test_manager(5);
        fs::create_dir_all(manager.backup_dir()).unwrap();
        fs::write(manager.backup_dir().join("notes.txt"), "hello").unwrap();
        fs::write(
            manager.backup_dir().join("contacts.csv.backup_20240101_120000"),
            "x",
        )
        .unwrap();
        fs::write(manager.backup_dir().join("todo.json.backup_garbage"), "x").unwrap();

        assert!(manager.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_retention_keeps_most_recent() {
        let (manager, _temp) = create_test_manager(2);

        for _ in 0..5 {
            manager.create_backup().unwrap();
        }
        let newest: Vec<_> = manager.list_backups().unwrap().into_iter().take(2).collect();

        let report = manager.enforce_retention(2).unwrap();
        assert_eq!(report.kept, 2);
        assert_eq!(report.deleted.len(), 3);
        assert!(report.failed.is_empty());

        assert_eq!(manager.list_backups().unwrap(), newest);
    }

    #[test]
    fn test_retention_continues_past_failures() {
        let (manager, _temp) = create_test_manager(1);
        fs::create_dir_all(manager.backup_dir()).unwrap();

        // A directory with a backup name cannot be removed with remove_file
        let stuck = manager.backup_dir().join("todo.json.backup_20000101_000000");
        fs::create_dir(&stuck).unwrap();
        let old = manager.backup_dir().join("todo.json.backup_20000102_000000");
        fs::write(&old, "old").unwrap();
        manager.create_backup().unwrap();

        let report = manager.enforce_retention(1).unwrap();
        assert_eq!(report.kept, 1);
        assert_eq!(report.deleted, vec![old]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, stuck);
    }

    #[test]
    fn test_missing_file_counts_as_removed() {
        let temp_dir = TempDir::new().unwrap();
        assert!(remove_backup(&temp_dir.path().join("gone")).is_ok());
    }

    #[test]
    fn test_create_backup_with_retention_uses_settings() {
        let (manager, _temp) = create_test_manager(3);

        for _ in 0..4 {
            manager.create_backup().unwrap();
        }
        let (backup, report) = manager.create_backup_with_retention().unwrap();

        assert!(backup.path.exists());
        assert_eq!(report.deleted.len(), 2);
        assert_eq!(manager.list_backups().unwrap().len(), 3);
    }

    #[test]
    fn test_missing_source_is_backup_error() {
        let (manager, _temp) = create_test_manager(3);
        fs::remove_file(&manager.source).unwrap();

        assert!(matches!(
            manager.create_backup(),
            Err(RecordbookError::Backup(_))
        ));
    }

    #[test]
    fn test_get_backup_and_latest() {
        let (manager, _temp) = create_test_manager(5);
        assert!(manager.get_latest_backup().unwrap().is_none());

        let backup = manager.create_backup().unwrap();
        assert_eq!(manager.get_latest_backup().unwrap(), Some(backup.clone()));
        assert_eq!(manager.get_backup(&backup.filename).unwrap(), Some(backup));
        assert!(manager.get_backup("todo.json.backup_nope").unwrap().is_none());
    }

    #[test]
    fn test_parse_backup_suffix() {
        let (ts, seq) = parse_backup_suffix("20251127_143022").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2025, 11, 27));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 30, 22));
        assert_eq!(seq, 0);

        assert_eq!(parse_backup_suffix("20251127_143022_4").unwrap().1, 4);
        assert!(parse_backup_suffix("20251127_143022x").is_none());
        assert!(parse_backup_suffix("2025").is_none());
    }
}
