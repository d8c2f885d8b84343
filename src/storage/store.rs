//! Record store
//!
//! One engine serves every record kind: the [`Schema`] decides which fields
//! exist and the [`StorageBackend`] decides how they reach disk. Every
//! mutation is staged on a copy of the state, persisted, and only then
//! swapped in, so memory never runs ahead of the artifact.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::backup::{BackupInfo, BackupManager, RetentionReport};
use crate::error::{RecordbookError, RecordbookResult};
use crate::models::{
    parse_date, FieldType, FieldValue, Priority, RawFields, Record, RecordId, Schema, Status,
};
use crate::validator::{ValidationMode, Validator};

use super::backend::{BackendKind, Snapshot, StorageBackend};

/// In-memory view of the artifact
#[derive(Debug, Clone)]
pub(super) struct StoreState {
    pub(super) next_id: RecordId,
    pub(super) records: Vec<Record>,
}

impl StoreState {
    fn empty() -> Self {
        Self {
            next_id: RecordId::FIRST,
            records: Vec::new(),
        }
    }

    pub(super) fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            next_id: self.next_id,
            records: self.records.iter().map(Record::to_stored).collect(),
        }
    }
}

/// Persistent collection of records of one kind
pub struct RecordStore {
    schema: Schema,
    backend: Box<dyn StorageBackend>,
    state: RwLock<StoreState>,
}

impl RecordStore {
    /// Open the store, creating an empty artifact if none exists
    pub fn open(schema: Schema, backend: Box<dyn StorageBackend>) -> RecordbookResult<Self> {
        let state = match backend.load()? {
            Some(snapshot) => {
                let state = hydrate(&schema, snapshot)?;
                debug!(
                    kind = %schema.kind(),
                    records = state.records.len(),
                    next_id = %state.next_id,
                    "loaded records"
                );
                state
            }
            None => {
                let state = StoreState::empty();
                backend.persist(&state.to_snapshot())?;
                info!(
                    kind = %schema.kind(),
                    path = %backend.artifact_path().display(),
                    "created empty record file"
                );
                state
            }
        };

        Ok(Self {
            schema,
            backend,
            state: RwLock::new(state),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Path of the persisted artifact
    pub fn artifact_path(&self) -> &Path {
        self.backend.artifact_path()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Create a record from raw field input
    pub fn create(&self, fields: &RawFields) -> RecordbookResult<Record> {
        let validator = Validator::new(&self.schema);
        let validated = validator.validate(fields, ValidationMode::Create)?;

        let mut state = self.write_state()?;
        let now = Utc::now();
        let record = Record {
            id: state.next_id,
            fields: validated.into_inner(),
            created_at: now,
            updated_at: now,
        };
        self.check_unique(&state, &record)?;

        let mut next = state.clone();
        next.next_id = record.id.next()?;
        next.records.push(record.clone());
        self.commit(&mut state, next)?;

        info!(kind = %self.schema.kind(), id = %record.id, "created record");
        Ok(record)
    }

    /// Get a live record by id
    pub fn read(&self, id: RecordId) -> RecordbookResult<Record> {
        let state = self.read_state()?;
        state
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| RecordbookError::record_not_found(id.to_string()))
    }

    /// Merge `changes` into an existing record
    ///
    /// An empty value clears the field. The merged record is validated as a
    /// whole; dates are only checked against today when this update changes
    /// them.
    pub fn update(&self, id: RecordId, changes: &RawFields) -> RecordbookResult<Record> {
        let validator = Validator::new(&self.schema);

        let mut state = self.write_state()?;
        let index = state
            .position(id)
            .ok_or_else(|| RecordbookError::record_not_found(id.to_string()))?;

        let updated = self.merge(&validator, &state.records[index], changes, Utc::now())?;
        self.check_unique(&state, &updated)?;

        let mut next = state.clone();
        next.records[index] = updated.clone();
        self.commit(&mut state, next)?;

        info!(kind = %self.schema.kind(), id = %id, "updated record");
        Ok(updated)
    }

    /// Remove a record and return it; its id is retired
    pub fn delete(&self, id: RecordId) -> RecordbookResult<Record> {
        let mut state = self.write_state()?;
        let index = state
            .position(id)
            .ok_or_else(|| RecordbookError::record_not_found(id.to_string()))?;

        let mut next = state.clone();
        let removed = next.records.remove(index);
        self.commit(&mut state, next)?;

        info!(kind = %self.schema.kind(), id = %id, "deleted record");
        Ok(removed)
    }

    /// Copy of every live record in insertion order
    pub fn list(&self) -> RecordbookResult<Vec<Record>> {
        Ok(self.read_state()?.records.clone())
    }

    pub fn count(&self) -> RecordbookResult<usize> {
        Ok(self.read_state()?.records.len())
    }

    /// The id the next created record will receive
    pub fn next_id(&self) -> RecordbookResult<RecordId> {
        Ok(self.read_state()?.next_id)
    }

    /// Copy the artifact into a new backup
    ///
    /// Holds the read lock for the duration of the copy so no mutation can
    /// interleave with it.
    pub fn backup(&self, manager: &BackupManager) -> RecordbookResult<BackupInfo> {
        let _state = self.read_state()?;
        manager.create_backup()
    }

    /// Back up, then prune according to the manager's retention policy
    pub fn backup_with_retention(
        &self,
        manager: &BackupManager,
    ) -> RecordbookResult<(BackupInfo, RetentionReport)> {
        let _state = self.read_state()?;
        manager.create_backup_with_retention()
    }

    /// Decode and validate a snapshot file in this store's format
    ///
    /// Returns the number of records it holds.
    pub(crate) fn check_snapshot_file(&self, path: &Path) -> RecordbookResult<usize> {
        let snapshot = self.backend.read_from(path)?;
        let state = hydrate(&self.schema, snapshot)?;
        Ok(state.records.len())
    }

    /// Replace all records with those of a snapshot file
    ///
    /// The high-water mark is the larger of the current and the file's, so
    /// ids retired since the file was written stay retired.
    pub(crate) fn replace_from_file(&self, path: &Path) -> RecordbookResult<usize> {
        let snapshot = self.backend.read_from(path)?;
        let mut restored = hydrate(&self.schema, snapshot)?;

        let mut state = self.write_state()?;
        restored.next_id = restored.next_id.max(state.next_id);
        let count = restored.records.len();
        self.commit(&mut state, restored)?;

        info!(
            kind = %self.schema.kind(),
            source = %path.display(),
            records = count,
            "replaced records from file"
        );
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Internals shared with the import path
    // ------------------------------------------------------------------

    pub(super) fn read_state(&self) -> RecordbookResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| RecordbookError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    pub(super) fn write_state(&self) -> RecordbookResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| RecordbookError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Persist `next` and swap it in; on failure the guard keeps the old state
    pub(super) fn commit(
        &self,
        guard: &mut RwLockWriteGuard<'_, StoreState>,
        next: StoreState,
    ) -> RecordbookResult<()> {
        self.backend.persist(&next.to_snapshot())?;
        **guard = next;
        Ok(())
    }

    /// Build the merged version of `existing` with `changes` applied
    pub(super) fn merge(
        &self,
        validator: &Validator<'_>,
        existing: &Record,
        changes: &RawFields,
        now: DateTime<Utc>,
    ) -> RecordbookResult<Record> {
        let mut merged = existing.raw_fields();
        let mut touched = BTreeSet::new();

        for (name, value) in changes {
            let value = value.trim();
            if self.changes_value(existing, name, value) {
                touched.insert(name.clone());
            }
            if value.is_empty() {
                merged.remove(name);
            } else {
                merged.insert(name.clone(), value.to_string());
            }
        }

        let validated = validator.validate(
            &merged,
            ValidationMode::Update {
                touched: &touched,
            },
        )?;

        Ok(Record {
            id: existing.id,
            fields: validated.into_inner(),
            created_at: existing.created_at,
            updated_at: now.max(existing.created_at),
        })
    }

    /// Whether `raw` gives `name` a different value than `existing` holds
    ///
    /// Values are compared after coercion, so `2020-1-1` leaves a stored
    /// `2020-01-01` untouched. Input that does not coerce counts as a change
    /// and is left for the validator to reject.
    fn changes_value(&self, existing: &Record, name: &str, raw: &str) -> bool {
        let current = match existing.get(name) {
            Some(current) => current,
            None => return !raw.is_empty(),
        };
        if raw.is_empty() {
            return true;
        }

        let coerced = match self.schema.field(name).map(|spec| spec.field_type) {
            Some(FieldType::Date) => parse_date(raw).map(FieldValue::Date),
            Some(FieldType::Priority) => Priority::parse(raw).map(FieldValue::Priority),
            Some(FieldType::Status) => Status::parse(raw).map(FieldValue::Status),
            _ => Some(FieldValue::Text(raw.to_string())),
        };
        coerced.as_ref() != Some(current)
    }

    /// Reject `candidate` if a unique field collides with another live record
    pub(super) fn check_unique(
        &self,
        state: &StoreState,
        candidate: &Record,
    ) -> RecordbookResult<()> {
        for spec in self.schema.fields().iter().filter(|f| f.unique) {
            let Some(value) = candidate.get(spec.name).map(unique_key) else {
                continue;
            };

            let taken = state
                .records
                .iter()
                .filter(|r| r.id != candidate.id)
                .any(|r| r.get(spec.name).map(unique_key).as_deref() == Some(value.as_str()));

            if taken {
                return Err(RecordbookError::Duplicate {
                    entity_type: self.schema.kind().entity_name(),
                    identifier: candidate
                        .get(spec.name)
                        .map(FieldValue::to_canonical)
                        .unwrap_or_default(),
                });
            }
        }
        Ok(())
    }
}

fn unique_key(value: &FieldValue) -> String {
    value.to_canonical().to_lowercase()
}

/// Turn a decoded snapshot into validated in-memory state
fn hydrate(schema: &Schema, snapshot: Snapshot) -> RecordbookResult<StoreState> {
    let validator = Validator::new(schema);
    let next_id = snapshot.next_id.max(snapshot.min_next_id()?);

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(snapshot.records.len());

    for stored in snapshot.records {
        if !seen.insert(stored.id) {
            return Err(RecordbookError::Storage(format!(
                "Duplicate record id {} in stored data",
                stored.id
            )));
        }

        let fields = validator
            .validate(&stored.fields, ValidationMode::Load)
            .map_err(|e| {
                RecordbookError::Storage(format!("Stored record {} is invalid: {}", stored.id, e))
            })?;

        records.push(Record {
            id: stored.id,
            fields: fields.into_inner(),
            created_at: stored.created_at,
            updated_at: stored.updated_at.max(stored.created_at),
        });
    }

    Ok(StoreState { next_id, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, RecordKind, Status};
    use crate::storage::backend::open_backend;
    use tempfile::TempDir;

    fn raw(pairs: &[(&str, &str)]) -> RawFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn open_store(dir: &TempDir, kind: RecordKind, backend: BackendKind) -> RecordStore {
        let schema = Schema::for_kind(kind);
        let path = dir
            .path()
            .join(format!("{}.{}", kind.as_str(), backend.extension()));
        let backend = open_backend(backend, path, &schema);
        RecordStore::open(schema, backend).unwrap()
    }

    fn todo_store(dir: &TempDir) -> RecordStore {
        open_store(dir, RecordKind::Todo, BackendKind::Json)
    }

    #[test]
    fn test_open_creates_empty_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);

        assert!(store.artifact_path().exists());
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.next_id().unwrap(), RecordId::FIRST);
    }

    #[test]
    fn test_create_applies_defaults_and_stamps() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);

        let record = store.create(&raw(&[("title", "Buy milk")])).unwrap();

        assert_eq!(record.id, RecordId::FIRST);
        assert_eq!(record.priority(), Some(Priority::Medium));
        assert_eq!(record.status(), Some(Status::Pending));
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(store.read(record.id).unwrap(), record);
    }

    #[test]
    fn test_invalid_create_leaves_count_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);
        store.create(&raw(&[("title", "Keep me")])).unwrap();

        let err = store.create(&raw(&[("title", "   ")])).unwrap_err();
        assert!(err.is_validation());

        let err = store
            .create(&raw(&[("title", "Bad"), ("priority", "urgent")]))
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.next_id().unwrap(), RecordId::from_raw(2));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);

        let first = store.create(&raw(&[("title", "One")])).unwrap();
        store.delete(first.id).unwrap();
        let second = store.create(&raw(&[("title", "Two")])).unwrap();

        assert_ne!(first.id, second.id);
        assert!(store.read(first.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_high_water_mark_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = todo_store(&temp_dir);
            let a = store.create(&raw(&[("title", "A")])).unwrap();
            store.create(&raw(&[("title", "B")])).unwrap();
            store.delete(a.id).unwrap();
        }

        let store = todo_store(&temp_dir);
        assert_eq!(store.count().unwrap(), 1);
        let c = store.create(&raw(&[("title", "C")])).unwrap();
        assert_eq!(c.id, RecordId::from_raw(3));
    }

    #[test]
    fn test_csv_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = open_store(&temp_dir, RecordKind::Contacts, BackendKind::Csv);
            let ada = store
                .create(&raw(&[
                    ("name", "Ada Lovelace"),
                    ("phone", "+44 20 7946 0018"),
                    ("email", "ada@example.com"),
                ]))
                .unwrap();
            store.delete(ada.id).unwrap();
        }

        let store = open_store(&temp_dir, RecordKind::Contacts, BackendKind::Csv);
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.next_id().unwrap(), RecordId::from_raw(2));
    }

    #[test]
    fn test_update_merges_and_clears() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);
        let record = store
            .create(&raw(&[("title", "Write"), ("category", "work")]))
            .unwrap();

        let updated = store
            .update(record.id, &raw(&[("status", "completed"), ("category", "")]))
            .unwrap();

        assert_eq!(updated.text("title"), Some("Write"));
        assert_eq!(updated.status(), Some(Status::Completed));
        assert!(updated.get("category").is_none());
        assert_eq!(updated.created_at, record.created_at);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn test_update_cannot_clear_required_field() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);
        let record = store.create(&raw(&[("title", "Write")])).unwrap();

        let err = store.update(record.id, &raw(&[("title", "")])).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.read(record.id).unwrap(), record);
    }

    #[test]
    fn test_update_status_of_overdue_task() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);

        let mut state = store.write_state().unwrap();
        let past = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let now = Utc::now();
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("title".to_string(), FieldValue::Text("Old".into()));
        fields.insert("due_date".to_string(), FieldValue::Date(past));
        fields.insert("status".to_string(), FieldValue::Status(Status::Pending));
        fields.insert("priority".to_string(), FieldValue::Priority(Priority::Low));
        let mut next = state.clone();
        next.records.push(Record {
            id: RecordId::FIRST,
            fields,
            created_at: now,
            updated_at: now,
        });
        next.next_id = RecordId::from_raw(2);
        store.commit(&mut state, next).unwrap();
        drop(state);

        let updated = store
            .update(RecordId::FIRST, &raw(&[("status", "completed")]))
            .unwrap();
        assert_eq!(updated.status(), Some(Status::Completed));

        let err = store
            .update(RecordId::FIRST, &raw(&[("due_date", "2020-01-02")]))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_restating_past_date_in_other_spelling_is_not_a_change() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);

        let mut state = store.write_state().unwrap();
        let past = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let now = Utc::now();
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("title".to_string(), FieldValue::Text("Old".into()));
        fields.insert("due_date".to_string(), FieldValue::Date(past));
        fields.insert("status".to_string(), FieldValue::Status(Status::Pending));
        fields.insert("priority".to_string(), FieldValue::Priority(Priority::Low));
        let mut next = state.clone();
        next.records.push(Record {
            id: RecordId::FIRST,
            fields,
            created_at: now,
            updated_at: now,
        });
        next.next_id = RecordId::from_raw(2);
        store.commit(&mut state, next).unwrap();
        drop(state);

        let updated = store
            .update(
                RecordId::FIRST,
                &raw(&[
                    ("due_date", "2020-1-1"),
                    ("status", "completed"),
                    ("priority", "LOW"),
                ]),
            )
            .unwrap();
        assert_eq!(updated.due_date(), Some(past));
        assert_eq!(updated.status(), Some(Status::Completed));

        // Clearing the date is a change, and the schema allows it
        let cleared = store
            .update(RecordId::FIRST, &raw(&[("due_date", "")]))
            .unwrap();
        assert_eq!(cleared.due_date(), None);
    }

    #[test]
    fn test_update_and_delete_missing_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);

        let id = RecordId::from_raw(99);
        assert!(store.update(id, &raw(&[("title", "x")])).unwrap_err().is_not_found());
        assert!(store.delete(id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_unknown_field_on_update() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);
        let record = store.create(&raw(&[("title", "Write")])).unwrap();

        let err = store.update(record.id, &raw(&[("id", "5")])).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_duplicate_contact_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir, RecordKind::Contacts, BackendKind::Json);
        let fields = raw(&[
            ("name", "Ada Lovelace"),
            ("phone", "555-0100-200"),
            ("email", "ada@example.com"),
        ]);
        let ada = store.create(&fields).unwrap();

        let mut shouting = fields.clone();
        shouting.insert("name".into(), "ADA LOVELACE".into());
        let err = store.create(&shouting).unwrap_err();
        assert!(matches!(err, RecordbookError::Duplicate { .. }));

        // Re-saving the same name on the same record is fine
        store
            .update(ada.id, &raw(&[("name", "Ada Lovelace")]))
            .unwrap();
    }

    #[test]
    fn test_failed_persist_keeps_memory_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);
        let record = store.create(&raw(&[("title", "Stay")])).unwrap();

        // A directory squatting on the temp path makes the next write fail
        let temp = crate::storage::file_io::temp_path_for(store.artifact_path());
        std::fs::create_dir(&temp).unwrap();

        let err = store.create(&raw(&[("title", "Lost")])).unwrap_err();
        assert!(matches!(err, RecordbookError::Storage(_)));
        assert!(store.delete(record.id).is_err());

        assert_eq!(store.list().unwrap(), vec![record]);
        assert_eq!(store.next_id().unwrap(), RecordId::from_raw(2));
    }

    #[test]
    fn test_corrupt_artifact_fails_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todo.json");
        std::fs::write(
            &path,
            r#"{"schema_version":1,"kind":"todo","next_id":2,"records":[
                {"id":1,"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z","priority":"urgent","title":"x"}
            ]}"#,
        )
        .unwrap();

        let schema = Schema::todo();
        let backend = open_backend(BackendKind::Json, path, &schema);
        let result = RecordStore::open(schema, backend);
        assert!(matches!(result, Err(RecordbookError::Storage(_))));
    }

    #[test]
    fn test_artifact_with_largest_id_fails_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todo.json");
        std::fs::write(
            &path,
            r#"{"schema_version":1,"kind":"todo","next_id":2,"records":[
                {"id":18446744073709551615,"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z","title":"x"}
            ]}"#,
        )
        .unwrap();

        let schema = Schema::todo();
        let backend = open_backend(BackendKind::Json, path, &schema);
        let result = RecordStore::open(schema, backend);
        assert!(matches!(result, Err(RecordbookError::Storage(_))));
    }

    #[test]
    fn test_loading_allows_past_dates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("planner.json");
        std::fs::write(
            &path,
            r#"{"schema_version":1,"kind":"planner","next_id":1,"records":[
                {"id":4,"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z",
                 "title":"Old plan","priority":"high","due_date":"2024-01-10"}
            ]}"#,
        )
        .unwrap();

        let schema = Schema::planner();
        let backend = open_backend(BackendKind::Json, path, &schema);
        let store = RecordStore::open(schema, backend).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.next_id().unwrap(), RecordId::from_raw(5));
    }

    #[test]
    fn test_replace_from_file_keeps_high_water_mark() {
        let temp_dir = TempDir::new().unwrap();
        let store = todo_store(&temp_dir);
        store.create(&raw(&[("title", "Before")])).unwrap();

        let saved = temp_dir.path().join("saved.json");
        std::fs::copy(store.artifact_path(), &saved).unwrap();

        let later = store.create(&raw(&[("title", "Later")])).unwrap();
        store.delete(later.id).unwrap();

        assert_eq!(store.check_snapshot_file(&saved).unwrap(), 1);
        assert_eq!(store.replace_from_file(&saved).unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.next_id().unwrap(), RecordId::from_raw(3));
    }
}
