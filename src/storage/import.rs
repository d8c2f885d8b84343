//! Bulk upsert of externally supplied records
//!
//! Entries are applied to a staged copy of the state and persisted once.
//! Each entry either updates a live record, inserts under its own id, or is
//! created fresh; invalid entries are collected rather than aborting the
//! batch unless the caller asks for strict behavior.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use tracing::{info, warn};

use crate::error::{RecordbookError, RecordbookResult};
use crate::models::{RawFields, Record, RecordId};
use crate::validator::{ValidationMode, Validator};

use super::store::{RecordStore, StoreState};

/// One record as it appears in an import file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportEntry {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: RawFields,
}

/// An entry that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    /// Position of the entry in the import file
    pub index: usize,
    pub id: Option<RecordId>,
    pub reason: String,
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "entry {} ({}): {}", self.index, id, self.reason),
            None => write!(f, "entry {}: {}", self.index, self.reason),
        }
    }
}

/// What an import did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records inserted, under their own id or a fresh one
    pub created: Vec<RecordId>,
    /// Live records that were merged with the entry
    pub updated: Vec<RecordId>,
    /// Entries whose id was retired: (requested id, assigned id)
    pub reassigned: Vec<(RecordId, RecordId)>,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    /// Number of entries that changed the store
    pub fn applied(&self) -> usize {
        self.created.len() + self.updated.len() + self.reassigned.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Outcome {
    Created(RecordId),
    Updated(RecordId),
    Reassigned(RecordId, RecordId),
}

impl RecordStore {
    /// Apply a batch of entries
    ///
    /// `Err` items are entries that could not be decoded; they are reported
    /// as failures at their index. With `strict`, any failure aborts the batch
    /// and nothing is written.
    pub fn import_entries(
        &self,
        entries: Vec<Result<ImportEntry, String>>,
        strict: bool,
    ) -> RecordbookResult<ImportReport> {
        let validator = Validator::new(self.schema());
        let now = Utc::now();

        let mut state = self.write_state()?;
        let mut next = state.clone();
        let mut report = ImportReport::default();

        for (index, entry) in entries.into_iter().enumerate() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(reason) => {
                    report.failures.push(ImportFailure {
                        index,
                        id: None,
                        reason,
                    });
                    continue;
                }
            };

            let requested = entry.id;
            match self.apply_entry(&validator, &mut next, entry, now) {
                Ok(Outcome::Created(id)) => report.created.push(id),
                Ok(Outcome::Updated(id)) => report.updated.push(id),
                Ok(Outcome::Reassigned(from, to)) => report.reassigned.push((from, to)),
                Err(e) => report.failures.push(ImportFailure {
                    index,
                    id: requested,
                    reason: e.to_string(),
                }),
            }
        }

        if strict {
            if let Some(first) = report.failures.first() {
                return Err(RecordbookError::Import(format!(
                    "{} invalid entries, nothing imported; first: {}",
                    report.failures.len(),
                    first
                )));
            }
        }

        for failure in &report.failures {
            warn!(kind = %self.schema().kind(), "skipped import {}", failure);
        }

        if report.applied() > 0 {
            self.commit(&mut state, next)?;
        }

        info!(
            kind = %self.schema().kind(),
            created = report.created.len(),
            updated = report.updated.len(),
            reassigned = report.reassigned.len(),
            failed = report.failures.len(),
            "imported records"
        );
        Ok(report)
    }

    fn apply_entry(
        &self,
        validator: &Validator<'_>,
        state: &mut StoreState,
        entry: ImportEntry,
        now: DateTime<Utc>,
    ) -> RecordbookResult<Outcome> {
        match entry.id {
            Some(id) => {
                if let Some(index) = state.position(id) {
                    let updated = self.merge(validator, &state.records[index], &entry.fields, now)?;
                    self.check_unique(state, &updated)?;
                    state.records[index] = updated;
                    Ok(Outcome::Updated(id))
                } else if id >= state.next_id {
                    self.insert(validator, state, id, entry, now)?;
                    Ok(Outcome::Created(id))
                } else {
                    let fresh = state.next_id;
                    self.insert(validator, state, fresh, entry, now)?;
                    Ok(Outcome::Reassigned(id, fresh))
                }
            }
            None => {
                let fresh = state.next_id;
                self.insert(validator, state, fresh, entry, now)?;
                Ok(Outcome::Created(fresh))
            }
        }
    }

    fn insert(
        &self,
        validator: &Validator<'_>,
        state: &mut StoreState,
        id: RecordId,
        entry: ImportEntry,
        now: DateTime<Utc>,
    ) -> RecordbookResult<()> {
        let after = id.next()?;
        let fields = validator.validate(&entry.fields, ValidationMode::Load)?;

        let created_at = entry.created_at.unwrap_or(now);
        let updated_at = entry.updated_at.unwrap_or(created_at).max(created_at);

        let record = Record {
            id,
            fields: fields.into_inner(),
            created_at,
            updated_at,
        };
        self.check_unique(state, &record)?;

        state.records.push(record);
        state.next_id = state.next_id.max(after);
        Ok(())
    }
}
