//! Field validation
//!
//! The validator turns raw string input into typed field values for one
//! [`Schema`], or reports the first constraint that input violates. It has no
//! side effects; the store calls it before every mutation.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::{
    parse_date, FieldSpec, FieldType, FieldValue, Priority, RawFields, Schema, StatusSet,
    MAX_TEXT_LEN,
};

const PHONE_PATTERN: &str = r"^\+?[\d\s\-\(\)]{7,}$";
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// The constraint a field value violated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// A required field is missing or blank
    Required,
    /// The field is not part of the record kind
    UnknownField,
    /// Text exceeds the maximum length
    TooLong { max: usize, actual: usize },
    /// Value does not parse as a `YYYY-MM-DD` date
    InvalidDate(String),
    /// Date lies before today on a create (or on an update that changes it)
    DateInPast(NaiveDate),
    /// Value is not a member of the field's enumeration
    InvalidChoice {
        value: String,
        allowed: Vec<&'static str>,
    },
    /// Value does not look like a phone number / email address
    InvalidFormat(&'static str),
    /// The field was given more than one value in a single request
    Repeated,
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "value is required"),
            Self::UnknownField => write!(f, "unknown field"),
            Self::TooLong { max, actual } => {
                write!(f, "too long ({} chars, max {})", actual, max)
            }
            Self::InvalidDate(value) => {
                write!(f, "'{}' is not a valid date (expected YYYY-MM-DD)", value)
            }
            Self::DateInPast(date) => write!(f, "date {} is in the past", date),
            Self::InvalidChoice { value, allowed } => {
                write!(f, "'{}' is not one of: {}", value, allowed.join(", "))
            }
            Self::InvalidFormat(what) => write!(f, "invalid {} format", what),
            Self::Repeated => write!(f, "given more than once"),
        }
    }
}

/// A field constraint violation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {rule}")]
pub struct ValidationError {
    pub field: String,
    pub rule: ValidationRule,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, rule: ValidationRule) -> Self {
        Self {
            field: field.into(),
            rule,
        }
    }
}

/// Which write path is being validated
#[derive(Debug, Clone, Copy)]
pub enum ValidationMode<'a> {
    /// A brand new record; every date must be today or later
    Create,
    /// A merged update; only dates listed in `touched` are checked against today
    Update { touched: &'a BTreeSet<String> },
    /// Data read back from disk, a backup or an import file
    Load,
}

impl ValidationMode<'_> {
    fn checks_past_dates(&self, field: &str) -> bool {
        match self {
            Self::Create => true,
            Self::Update { touched } => touched.contains(field),
            Self::Load => false,
        }
    }
}

/// Typed values that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFields(BTreeMap<String, FieldValue>);

impl ValidatedFields {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn into_inner(self) -> BTreeMap<String, FieldValue> {
        self.0
    }
}

/// Validates raw input against a schema
pub struct Validator<'a> {
    schema: &'a Schema,
    today: NaiveDate,
}

impl<'a> Validator<'a> {
    /// Create a validator that treats the local calendar date as today
    pub fn new(schema: &'a Schema) -> Self {
        Self::with_today(schema, Local::now().date_naive())
    }

    /// Create a validator with a fixed notion of today (useful for testing)
    pub fn with_today(schema: &'a Schema, today: NaiveDate) -> Self {
        Self { schema, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Validate a complete set of fields
    ///
    /// Unknown names are reported first, then fields are checked in schema
    /// order; the first failure is returned.
    pub fn validate(
        &self,
        fields: &RawFields,
        mode: ValidationMode<'_>,
    ) -> Result<ValidatedFields, ValidationError> {
        if let Some(unknown) = fields.keys().find(|name| self.schema.field(name).is_none()) {
            return Err(ValidationError::new(unknown.as_str(), ValidationRule::UnknownField));
        }

        let mut validated = BTreeMap::new();

        for spec in self.schema.fields() {
            let raw = fields
                .get(spec.name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty());

            let raw = match (raw, spec.default) {
                (Some(value), _) => value,
                (None, _) if spec.required => {
                    return Err(ValidationError::new(spec.name, ValidationRule::Required));
                }
                (None, Some(default)) => default,
                (None, None) => continue,
            };

            let value = self.coerce(spec, raw, mode)?;
            validated.insert(spec.name.to_string(), value);
        }

        Ok(ValidatedFields(validated))
    }

    fn coerce(
        &self,
        spec: &FieldSpec,
        raw: &str,
        mode: ValidationMode<'_>,
    ) -> Result<FieldValue, ValidationError> {
        let fail = |rule| ValidationError::new(spec.name, rule);

        match spec.field_type {
            FieldType::Text | FieldType::Phone | FieldType::Email => {
                let len = raw.chars().count();
                if len > MAX_TEXT_LEN {
                    return Err(fail(ValidationRule::TooLong {
                        max: MAX_TEXT_LEN,
                        actual: len,
                    }));
                }
                if spec.field_type == FieldType::Phone && !is_phone(raw) {
                    return Err(fail(ValidationRule::InvalidFormat("phone number")));
                }
                if spec.field_type == FieldType::Email && !is_email(raw) {
                    return Err(fail(ValidationRule::InvalidFormat("email address")));
                }
                Ok(FieldValue::Text(raw.to_string()))
            }
            FieldType::Date => {
                let date =
                    parse_date(raw).ok_or_else(|| fail(ValidationRule::InvalidDate(raw.into())))?;
                if mode.checks_past_dates(spec.name) && date < self.today {
                    return Err(fail(ValidationRule::DateInPast(date)));
                }
                Ok(FieldValue::Date(date))
            }
            FieldType::Priority => Priority::parse(raw).map(FieldValue::Priority).ok_or_else(|| {
                fail(ValidationRule::InvalidChoice {
                    value: raw.to_string(),
                    allowed: Priority::ALL.iter().map(Priority::as_str).collect(),
                })
            }),
            FieldType::Status => {
                let set = self.schema.status_set().unwrap_or(StatusSet::Extended);
                crate::models::Status::parse(raw)
                    .filter(|status| set.allows(*status))
                    .map(FieldValue::Status)
                    .ok_or_else(|| {
                        fail(ValidationRule::InvalidChoice {
                            value: raw.to_string(),
                            allowed: set.names(),
                        })
                    })
            }
        }
    }
}

fn is_phone(value: &str) -> bool {
    static PHONE: OnceLock<Option<Regex>> = OnceLock::new();
    PHONE
        .get_or_init(|| Regex::new(PHONE_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

fn is_email(value: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}
