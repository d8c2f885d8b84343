//! Core data models for recordbook
//!
//! Records, their typed field values, and the schema descriptors that define
//! each record kind.

pub mod field;
pub mod ids;
pub mod record;
pub mod schema;

pub use field::{parse_date, FieldValue, Priority, Status, StatusSet, DATE_FORMAT};
pub use ids::RecordId;
pub use record::{RawFields, Record, StoredRecord};
pub use schema::{FieldSpec, FieldType, RecordKind, Schema, MAX_TEXT_LEN};
