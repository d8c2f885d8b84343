//! Storage backend abstraction
//!
//! The store persists whole snapshots through a [`StorageBackend`]. Each
//! backend owns one artifact on disk and knows how to encode a snapshot into
//! it. Backups, restores and the store itself treat that artifact opaquely.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::RecordbookResult;
use crate::models::{RecordId, Schema, StoredRecord};

use super::csv::CsvBackend;
use super::json::JsonBackend;

/// On-disk encoding of the record artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One JSON document per collection
    #[default]
    Json,
    /// Header row plus one delimited row per record
    Csv,
}

impl BackendKind {
    /// Parse a backend kind from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" | "document" => Some(Self::Json),
            "csv" | "delimited" => Some(Self::Csv),
            _ => None,
        }
    }

    /// File extension of the artifact
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Everything a backend persists: the records and the id high-water mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Next id the store will issue; never decreases
    pub next_id: RecordId,
    /// Records in insertion order
    pub records: Vec<StoredRecord>,
}

impl Snapshot {
    /// A snapshot with no records and a fresh counter
    pub fn empty() -> Self {
        Self {
            next_id: RecordId::FIRST,
            records: Vec::new(),
        }
    }

    /// Smallest high-water mark consistent with the records present
    pub fn min_next_id(&self) -> RecordbookResult<RecordId> {
        match self.records.iter().map(|r| r.id).max() {
            Some(highest) => highest.next(),
            None => Ok(RecordId::FIRST),
        }
    }
}

/// A persistence backend for one record artifact
pub trait StorageBackend: Send + Sync {
    /// Encoding used by this backend
    fn kind(&self) -> BackendKind;

    /// Path of the artifact this backend owns
    fn artifact_path(&self) -> &Path;

    /// Decode a snapshot from any file in this backend's format
    fn read_from(&self, path: &Path) -> RecordbookResult<Snapshot>;

    /// Atomically encode a snapshot into `path`
    fn write_to(&self, path: &Path, snapshot: &Snapshot) -> RecordbookResult<()>;

    /// Load the artifact, or `None` if it has never been written
    fn load(&self) -> RecordbookResult<Option<Snapshot>> {
        let path = self.artifact_path();
        if !path.exists() {
            return Ok(None);
        }
        self.read_from(path).map(Some)
    }

    /// Durably replace the artifact with `snapshot`
    fn persist(&self, snapshot: &Snapshot) -> RecordbookResult<()> {
        self.write_to(self.artifact_path(), snapshot)
    }
}

/// Build the backend for `kind` over the artifact at `path`
pub fn open_backend(kind: BackendKind, path: PathBuf, schema: &Schema) -> Box<dyn StorageBackend> {
    match kind {
        BackendKind::Json => Box::new(JsonBackend::new(path, schema.kind())),
        BackendKind::Csv => Box::new(CsvBackend::new(path, schema.field_names())),
    }
}
