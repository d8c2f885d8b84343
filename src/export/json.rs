//! JSON export and import
//!
//! Exports are a plain JSON array of flat record objects, ids and timestamps
//! included. Imports accept the same array, or a document-backend data file
//! (an object with a `records` array).

use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::error::{RecordbookError, RecordbookResult};
use crate::models::Record;
use crate::storage::file_io::write_atomic;
use crate::storage::{ImportEntry, ImportReport, RecordStore};

/// Export every record to JSON
pub fn export_json<W: Write>(store: &RecordStore, writer: &mut W, pretty: bool) -> RecordbookResult<usize> {
    let records = store.list()?;
    write_records_json(&records, writer, pretty)?;
    Ok(records.len())
}

/// Serialize records as a JSON array
pub fn write_records_json<W: Write>(
    records: &[Record],
    writer: &mut W,
    pretty: bool,
) -> RecordbookResult<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, records)
    } else {
        serde_json::to_writer(&mut *writer, records)
    }
    .map_err(|e| RecordbookError::Export(e.to_string()))?;

    writeln!(writer).map_err(|e| RecordbookError::Export(e.to_string()))
}

/// Export every record to a JSON file, replacing it atomically
pub fn export_json_to_path(store: &RecordStore, path: &Path) -> RecordbookResult<usize> {
    let records = store.list()?;
    write_atomic(path, |writer| write_records_json(&records, writer, true))
        .map_err(|e| RecordbookError::Export(format!("{}: {}", path.display(), e)))?;
    Ok(records.len())
}

/// Decode the entries of an import file
///
/// The outer shape must be valid; individual entries that fail to decode are
/// returned as `Err` so they can be reported by index.
pub fn parse_import_json(json_str: &str) -> RecordbookResult<Vec<Result<ImportEntry, String>>> {
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| RecordbookError::Import(format!("Invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut document) => match document.remove("records") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(RecordbookError::Import(
                    "Expected an array of records or an object with a 'records' array".into(),
                ))
            }
        },
        _ => {
            return Err(RecordbookError::Import(
                "Expected an array of records".into(),
            ))
        }
    };

    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value::<ImportEntry>(item).map_err(|e| e.to_string()))
        .collect())
}

/// Import a JSON file into the store
pub fn import_json(store: &RecordStore, path: &Path, strict: bool) -> RecordbookResult<ImportReport> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        RecordbookError::Import(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let entries = parse_import_json(&contents)?;
    store.import_entries(entries, strict)
}
