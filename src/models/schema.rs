//! Record kind descriptors
//!
//! A [`Schema`] lists the fields of a record kind together with the
//! enumeration sets its enum fields accept. The store, the validator and the
//! query engine are all driven by it, so to-do items, planner tasks and
//! contacts share one engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::StatusSet;

/// Maximum length of free-text fields
pub const MAX_TEXT_LEN: usize = 255;

/// The kinds of record the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Simple to-do list
    #[default]
    Todo,
    /// Task planner with mandatory due dates and an extended status set
    Planner,
    /// Contact book
    Contacts,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [Self::Todo, Self::Planner, Self::Contacts];

    /// Parse a record kind from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "todo" | "todos" | "tasks" => Some(Self::Todo),
            "planner" | "plan" => Some(Self::Planner),
            "contacts" | "contact" => Some(Self::Contacts),
            _ => None,
        }
    }

    /// Name used for data files and in persisted documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Planner => "planner",
            Self::Contacts => "contacts",
        }
    }

    /// Singular noun for messages
    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::Todo | Self::Planner => "Task",
            Self::Contacts => "Contact",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type of a field, which decides coercion and which match rules apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free text, trimmed and length limited
    Text,
    /// Calendar date in `YYYY-MM-DD` form
    Date,
    /// One of [`crate::models::Priority`]
    Priority,
    /// One of the schema's [`StatusSet`]
    Status,
    /// Phone number (free text with a format check)
    Phone,
    /// Email address (free text with a format check)
    Email,
}

impl FieldType {
    /// Whether values of this type are matched as free text
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::Phone | Self::Email)
    }
}

/// Description of one field of a record kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    /// Values must be unique across live records, ignoring case
    pub unique: bool,
    /// Canonical value used when the field is absent
    pub default: Option<&'static str>,
}

impl FieldSpec {
    const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            unique: false,
            default: None,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }
}

/// Field list and enumeration sets of a record kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    kind: RecordKind,
    fields: Vec<FieldSpec>,
    status_set: Option<StatusSet>,
}

impl Schema {
    /// Schema for a built-in record kind
    pub fn for_kind(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Todo => Self::todo(),
            RecordKind::Planner => Self::planner(),
            RecordKind::Contacts => Self::contacts(),
        }
    }

    /// To-do list: optional due date, pending/completed statuses
    pub fn todo() -> Self {
        Self {
            kind: RecordKind::Todo,
            fields: vec![
                FieldSpec::new("title", FieldType::Text).required(),
                FieldSpec::new("description", FieldType::Text),
                FieldSpec::new("priority", FieldType::Priority).default_value("medium"),
                FieldSpec::new("status", FieldType::Status).default_value("pending"),
                FieldSpec::new("due_date", FieldType::Date),
                FieldSpec::new("category", FieldType::Text),
            ],
            status_set: Some(StatusSet::Minimal),
        }
    }

    /// Task planner: priority and due date are mandatory
    pub fn planner() -> Self {
        Self {
            kind: RecordKind::Planner,
            fields: vec![
                FieldSpec::new("title", FieldType::Text).required(),
                FieldSpec::new("description", FieldType::Text),
                FieldSpec::new("priority", FieldType::Priority).required(),
                FieldSpec::new("due_date", FieldType::Date).required(),
                FieldSpec::new("category", FieldType::Text),
                FieldSpec::new("status", FieldType::Status).default_value("pending"),
            ],
            status_set: Some(StatusSet::Extended),
        }
    }

    /// Contact book: every field required, names unique
    pub fn contacts() -> Self {
        Self {
            kind: RecordKind::Contacts,
            fields: vec![
                FieldSpec::new("name", FieldType::Text).required().unique(),
                FieldSpec::new("phone", FieldType::Phone).required(),
                FieldSpec::new("email", FieldType::Email).required(),
            ],
            status_set: None,
        }
    }

    /// Replace the status set (e.g. a to-do list with the extended statuses)
    pub fn with_status_set(mut self, status_set: StatusSet) -> Self {
        self.status_set = Some(status_set);
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in schema order
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Status set for the kind's status field, if it has one
    pub fn status_set(&self) -> Option<StatusSet> {
        self.status_set
    }

    /// The field that names a record (`title` or `name`)
    pub fn label_field(&self) -> &'static str {
        self.fields
            .iter()
            .find(|f| f.required && f.field_type == FieldType::Text)
            .map(|f| f.name)
            .unwrap_or("id")
    }
}
