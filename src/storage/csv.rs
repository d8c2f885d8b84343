//! Delimited-text backend
//!
//! Layout: a `#next_id=<n>` marker line, a header row
//! (`id,created_at,updated_at,<fields...>`) and one row per record. An empty
//! cell means the field is absent.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{RecordbookError, RecordbookResult};
use crate::models::{RecordId, StoredRecord};

use super::backend::{BackendKind, Snapshot, StorageBackend};
use super::file_io::write_atomic;

const NEXT_ID_MARKER: &str = "#next_id=";
const ID_COLUMN: &str = "id";
const CREATED_COLUMN: &str = "created_at";
const UPDATED_COLUMN: &str = "updated_at";

/// Backend writing one CSV file
pub struct CsvBackend {
    path: PathBuf,
    columns: Vec<&'static str>,
}

impl CsvBackend {
    /// Create a backend whose field columns follow `columns`
    pub fn new(path: PathBuf, columns: Vec<&'static str>) -> Self {
        Self { path, columns }
    }

    fn header(&self) -> Vec<&str> {
        let mut header = vec![ID_COLUMN, CREATED_COLUMN, UPDATED_COLUMN];
        header.extend(self.columns.iter().copied());
        header
    }
}

fn csv_error(path: &Path, err: impl std::fmt::Display) -> RecordbookError {
    RecordbookError::Storage(format!("Failed to parse {}: {}", path.display(), err))
}

fn parse_timestamp(path: &Path, value: &str) -> RecordbookResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| csv_error(path, format!("bad timestamp '{}': {}", value, e)))
}

impl StorageBackend for CsvBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Csv
    }

    fn artifact_path(&self) -> &Path {
        &self.path
    }

    fn read_from(&self, path: &Path) -> RecordbookResult<Snapshot> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RecordbookError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let (marker, body) = match contents.split_once('\n') {
            Some((first, rest)) if first.starts_with(NEXT_ID_MARKER) => (Some(first), rest),
            _ if contents.starts_with(NEXT_ID_MARKER) => (Some(contents.as_str()), ""),
            _ => (None, contents.as_str()),
        };

        let marked_next_id = match marker {
            Some(line) => {
                let raw = line.trim_end().trim_start_matches(NEXT_ID_MARKER);
                Some(RecordId::parse(raw).map_err(|e| csv_error(path, e))?)
            }
            None => None,
        };

        let mut records = Vec::new();

        if !body.trim().is_empty() {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .from_reader(body.as_bytes());

            let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
            for required in [ID_COLUMN, CREATED_COLUMN, UPDATED_COLUMN] {
                if !headers.iter().any(|h| h == required) {
                    return Err(csv_error(path, format!("missing column '{}'", required)));
                }
            }

            for row in reader.records() {
                let row = row.map_err(|e| csv_error(path, e))?;

                let mut id = None;
                let mut created_at = None;
                let mut updated_at = None;
                let mut fields = BTreeMap::new();

                for (column, value) in headers.iter().zip(row.iter()) {
                    match column {
                        ID_COLUMN => id = Some(RecordId::parse(value).map_err(|e| csv_error(path, e))?),
                        CREATED_COLUMN => created_at = Some(parse_timestamp(path, value)?),
                        UPDATED_COLUMN => updated_at = Some(parse_timestamp(path, value)?),
                        _ if value.is_empty() => {}
                        _ => {
                            fields.insert(column.to_string(), value.to_string());
                        }
                    }
                }

                match (id, created_at, updated_at) {
                    (Some(id), Some(created_at), Some(updated_at)) => records.push(StoredRecord {
                        id,
                        created_at,
                        updated_at,
                        fields,
                    }),
                    _ => return Err(csv_error(path, "row is missing id or timestamps")),
                }
            }
        }

        let mut snapshot = Snapshot {
            next_id: RecordId::FIRST,
            records,
        };
        snapshot.next_id = marked_next_id
            .unwrap_or(RecordId::FIRST)
            .max(snapshot.min_next_id()?);

        Ok(snapshot)
    }

    fn write_to(&self, path: &Path, snapshot: &Snapshot) -> RecordbookResult<()> {
        write_atomic(path, |writer| {
            writeln!(writer, "{}{}", NEXT_ID_MARKER, snapshot.next_id.as_u64())
                .map_err(|e| RecordbookError::Storage(format!("Failed to write data: {}", e)))?;

            let mut csv_writer = csv::Writer::from_writer(&mut *writer);
            let write_err =
                |e: csv::Error| RecordbookError::Storage(format!("Failed to write data: {}", e));

            csv_writer.write_record(self.header()).map_err(write_err)?;

            for record in &snapshot.records {
                let mut row = vec![
                    record.id.as_u64().to_string(),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ];
                row.extend(
                    self.columns
                        .iter()
                        .map(|column| record.fields.get(*column).cloned().unwrap_or_default()),
                );
                csv_writer.write_record(&row).map_err(write_err)?;
            }

            csv_writer
                .flush()
                .map_err(|e| RecordbookError::Storage(format!("Failed to flush data: {}", e)))
        })
    }
}
