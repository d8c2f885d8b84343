//! Field values and the closed enumerations records are built from

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// Date format used for every date field
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Priority of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Self::Low, Self::Medium, Self::High];

    /// Parse a priority, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Canonical stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Status of a task
///
/// Which variants a record kind accepts is decided by its [`StatusSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    /// Parse a status, ignoring case and the separator style of "in progress"
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();

        match normalized.as_str() {
            "pending" => Some(Self::Pending),
            "inprogress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Canonical stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// The closed set of statuses a record kind accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSet {
    /// Pending and Completed only
    Minimal,
    /// Pending, In Progress, Completed and Cancelled
    Extended,
}

impl StatusSet {
    /// Statuses in this set, in display order
    pub fn variants(&self) -> &'static [Status] {
        match self {
            Self::Minimal => &[Status::Pending, Status::Completed],
            Self::Extended => &[
                Status::Pending,
                Status::InProgress,
                Status::Completed,
                Status::Cancelled,
            ],
        }
    }

    /// Whether a status belongs to this set
    pub fn allows(&self, status: Status) -> bool {
        self.variants().contains(&status)
    }

    /// Canonical names of the allowed statuses, for error messages
    pub fn names(&self) -> Vec<&'static str> {
        self.variants().iter().map(Status::as_str).collect()
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Priority(Priority),
    Status(Status),
}

impl FieldValue {
    /// The string this value is persisted as
    pub fn to_canonical(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::Priority(p) => p.as_str().to_string(),
            Self::Status(s) => s.as_str().to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::Priority(p) => write!(f, "{}", p),
            Self::Status(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}
