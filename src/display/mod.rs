//! Display formatting for terminal output
//!
//! Provides utilities for formatting records, backups and reports as
//! tables and detail views.

pub mod backup;
pub mod record;

pub use backup::{format_backup_list, format_import_report, format_retention_report};
pub use record::{format_record_details, format_record_list};
