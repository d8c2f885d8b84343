//! Record model
//!
//! A record is a set of typed fields plus the bookkeeping the store owns:
//! id and timestamps. [`StoredRecord`] is the flat, string-valued shape
//! records take on disk and in export files.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::field::{FieldValue, Priority, Status};
use super::ids::RecordId;

/// Raw field input: field name to unparsed string value
pub type RawFields = BTreeMap<String, String>;

/// A validated record held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Unique identifier, assigned by the store
    pub id: RecordId,

    /// Typed field values; absent optional fields have no entry
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last modified
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Text value of a field
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::as_text)
    }

    pub fn priority(&self) -> Option<Priority> {
        match self.fields.get("priority") {
            Some(FieldValue::Priority(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<Status> {
        match self.fields.get("status") {
            Some(FieldValue::Status(s)) => Some(*s),
            _ => None,
        }
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.fields.get("due_date").and_then(FieldValue::as_date)
    }

    /// Whether the task is past its due date and not finished
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        let open = !matches!(self.status(), Some(Status::Completed | Status::Cancelled));
        open && self.due_date().is_some_and(|due| due < today)
    }

    /// Field values in their canonical string form
    pub fn raw_fields(&self) -> RawFields {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_canonical()))
            .collect()
    }

    /// Convert to the flat persisted form
    pub fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            fields: self.raw_fields(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self
            .text("title")
            .or_else(|| self.text("name"))
            .unwrap_or("");
        write!(f, "{} {}", self.id, label)
    }
}

/// Flat persisted shape of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: RawFields,
}
