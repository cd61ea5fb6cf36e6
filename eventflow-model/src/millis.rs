//! Epoch-millisecond timestamps with a stable wire format.
//!
//! [`EpochMillis`] serializes as a plain integer, not as a structured
//! date/time object — the collector expects raw `creationDate` fields, and
//! a plain integer is also immune to any future change in how a generic
//! date/time library chooses to represent instants.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochMillis(i64);

impl EpochMillis {
    /// Construct from a raw millisecond value.
    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    /// The raw millisecond value.
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// The smaller of two timestamps.
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// The larger of two timestamps.
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }
}

impl From<i64> for EpochMillis {
    fn from(ms: i64) -> Self {
        Self(ms)
    }
}

impl std::fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
