//! CLI command for record export
//!
//! Writes the current kind's records as JSON or YAML, to a file or stdout.

use clap::ValueEnum;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::{RecordbookError, RecordbookResult};
use crate::export::{export_json, export_json_to_path, export_yaml, export_yaml_to_path};
use crate::storage::RecordStore;

/// Export format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// JSON array of flat records (re-importable)
    #[default]
    Json,
    /// YAML, human-readable
    Yaml,
}

/// Handle the export command
///
/// With no output path the export goes to stdout.
pub fn handle_export_command(
    store: &RecordStore,
    output: Option<PathBuf>,
    format: ExportFormat,
) -> RecordbookResult<()> {
    match output {
        Some(path) => {
            let count = match format {
                ExportFormat::Json => export_json_to_path(store, &path)?,
                ExportFormat::Yaml => export_yaml_to_path(store, &path)?,
            };
            println!("Exported {} records to: {}", count, path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            match format {
                ExportFormat::Json => {
                    export_json(store, &mut writer, true)?;
                    writeln!(writer).map_err(|e| RecordbookError::Export(e.to_string()))?;
                }
                ExportFormat::Yaml => {
                    export_yaml(store, &mut writer)?;
                }
            }
        }
    }

    Ok(())
}
