//! Backup and import report formatting

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::backup::{BackupInfo, RetentionReport};
use crate::storage::ImportReport;

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format backups as a table, newest first
pub fn format_backup_list(backups: &[BackupInfo]) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["#", "Filename", "Created", "Size"]);

    for (index, backup) in backups.iter().enumerate() {
        builder.push_record([
            (index + 1).to_string(),
            backup.filename.clone(),
            backup.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            format_size(backup.size_bytes),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::psql());
    table.to_string()
}

/// One-paragraph summary of a retention sweep
pub fn format_retention_report(report: &RetentionReport) -> String {
    let mut output = format!(
        "Kept {} backups, deleted {}",
        report.kept,
        report.deleted.len()
    );

    if !report.failed.is_empty() {
        output.push_str(&format!(", {} could not be deleted:", report.failed.len()));
        for (path, reason) in &report.failed {
            output.push_str(&format!("\n  {}: {}", path.display(), reason));
        }
    }

    output
}

/// Summary of an import, listing every failed entry
pub fn format_import_report(report: &ImportReport) -> String {
    let mut output = format!(
        "Imported {} records: {} created, {} updated, {} with new ids",
        report.applied(),
        report.created.len(),
        report.updated.len(),
        report.reassigned.len()
    );

    for (from, to) in &report.reassigned {
        output.push_str(&format!("\n  {} was retired; imported as {}", from, to));
    }

    if !report.failures.is_empty() {
        output.push_str(&format!("\n{} entries skipped:", report.failures.len()));
        for failure in &report.failures {
            output.push_str(&format!("\n  {}", failure));
        }
    }

    output
}
