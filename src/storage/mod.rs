//! Storage layer for recordbook
//!
//! Provides the record store, its pluggable on-disk backends (JSON document
//! and CSV) with atomic writes, and bulk import.

pub mod backend;
pub mod csv;
pub mod file_io;
pub mod import;
pub mod json;
pub mod store;

pub use backend::{open_backend, BackendKind, Snapshot, StorageBackend};
pub use file_io::{read_json, write_json_atomic};
pub use import::{ImportEntry, ImportFailure, ImportReport};
pub use store::RecordStore;

use crate::config::{RecordbookPaths, Settings};
use crate::error::RecordbookResult;
use crate::models::{RecordKind, Schema};

/// Open the store for `kind` using the configured backend
///
/// Creates the data and backup directories on first use.
pub fn open_store(
    paths: &RecordbookPaths,
    settings: &Settings,
    kind: RecordKind,
) -> RecordbookResult<RecordStore> {
    paths.ensure_directories()?;

    let schema = Schema::for_kind(kind);
    let path = paths.records_file(kind, settings.backend);
    let backend = open_backend(settings.backend, path, &schema);

    RecordStore::open(schema, backend)
}
