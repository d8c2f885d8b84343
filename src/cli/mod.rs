//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the store.

pub mod backup;
pub mod export;
pub mod import;
pub mod record;

pub use backup::{handle_backup_command, BackupCommands};
pub use export::{handle_export_command, ExportFormat};
pub use import::handle_import_command;
pub use record::{handle_record_command, parse_assignment, RecordCommands};
