//! Record identifiers
//!
//! Ids come from a monotonic counter owned by the store. The counter's
//! high-water mark is persisted with the records, so an id that was ever
//! issued is never issued again, even after the record is deleted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RecordbookError, RecordbookResult};

/// Display prefix for record ids
const DISPLAY_PREFIX: &str = "#";

/// Identifier of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// The first id a fresh store hands out
    pub const FIRST: RecordId = RecordId(1);

    /// Wrap a raw counter value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the underlying counter value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The id issued after this one
    ///
    /// Fails once the counter has reached `u64::MAX`.
    pub fn next(&self) -> RecordbookResult<Self> {
        self.0.checked_add(1).map(Self).ok_or_else(|| {
            RecordbookError::Storage(format!("No id can follow {}", self))
        })
    }

    /// Parse an id, accepting both `12` and `#12`
    pub fn parse(s: &str) -> Result<Self, std::num::ParseIntError> {
        let s = s.trim();
        let s = s.strip_prefix(DISPLAY_PREFIX).unwrap_or(s);
        Ok(Self(s.parse()?))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", DISPLAY_PREFIX, self.0)
    }
}

impl From<u64> for RecordId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
