//! YAML Export functionality
//!
//! Writes the same flat records as the JSON export in a human-readable form.

use std::io::Write;
use std::path::Path;

use chrono::Utc;

use crate::error::{RecordbookError, RecordbookResult};
use crate::storage::file_io::write_atomic;
use crate::storage::RecordStore;

fn export_err(e: impl std::fmt::Display) -> RecordbookError {
    RecordbookError::Export(e.to_string())
}

/// Export every record to YAML
pub fn export_yaml<W: Write>(store: &RecordStore, writer: &mut W) -> RecordbookResult<usize> {
    let records = store.list()?;

    writeln!(writer, "# recordbook {} export", store.schema().kind()).map_err(export_err)?;
    writeln!(writer, "# Generated: {}", Utc::now().to_rfc3339()).map_err(export_err)?;
    writeln!(writer, "# Records: {}", records.len()).map_err(export_err)?;
    writeln!(writer).map_err(export_err)?;

    serde_yaml::to_writer(&mut *writer, &records).map_err(export_err)?;

    Ok(records.len())
}

/// Export every record to a YAML file, replacing it atomically
pub fn export_yaml_to_path(store: &RecordStore, path: &Path) -> RecordbookResult<usize> {
    let mut count = 0;
    write_atomic(path, |writer| {
        count = export_yaml(store, writer)?;
        Ok(())
    })
    .map_err(|e| RecordbookError::Export(format!("{}: {}", path.display(), e)))?;
    Ok(count)
}
