//! Structured-document backend
//!
//! Stores the whole collection as one JSON document:
//! `{ "schema_version": 1, "kind": "todo", "next_id": 4, "records": [...] }`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RecordbookError, RecordbookResult};
use crate::models::{RecordId, RecordKind, StoredRecord};

use super::backend::{BackendKind, Snapshot, StorageBackend};
use super::file_io::{read_json_required, write_json_atomic};

/// Current document schema version
pub const DOCUMENT_SCHEMA_VERSION: u32 = 1;

/// Serializable document layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub kind: RecordKind,
    pub next_id: RecordId,
    #[serde(default)]
    pub records: Vec<StoredRecord>,
}

fn default_schema_version() -> u32 {
    DOCUMENT_SCHEMA_VERSION
}

/// Backend writing a single JSON document
pub struct JsonBackend {
    path: PathBuf,
    kind: RecordKind,
}

impl JsonBackend {
    pub fn new(path: PathBuf, kind: RecordKind) -> Self {
        Self { path, kind }
    }
}

impl StorageBackend for JsonBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Json
    }

    fn artifact_path(&self) -> &Path {
        &self.path
    }

    fn read_from(&self, path: &Path) -> RecordbookResult<Snapshot> {
        let document: JsonDocument = read_json_required(path)?;

        if document.schema_version > DOCUMENT_SCHEMA_VERSION {
            return Err(RecordbookError::Storage(format!(
                "{} has schema version {}, newer than supported {}",
                path.display(),
                document.schema_version,
                DOCUMENT_SCHEMA_VERSION
            )));
        }

        if document.kind != self.kind {
            return Err(RecordbookError::Storage(format!(
                "{} holds {} records, expected {}",
                path.display(),
                document.kind,
                self.kind
            )));
        }

        Ok(Snapshot {
            next_id: document.next_id,
            records: document.records,
        })
    }

    fn write_to(&self, path: &Path, snapshot: &Snapshot) -> RecordbookResult<()> {
        let document = JsonDocument {
            schema_version: DOCUMENT_SCHEMA_VERSION,
            kind: self.kind,
            next_id: snapshot.next_id,
            records: snapshot.records.clone(),
        };
        write_json_atomic(path, &document)
    }
}
