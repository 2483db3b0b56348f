//! Identity and ordering types for logview.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a row in the query log.
///
/// Row ids are assigned by the store, strictly increasing with insertion
/// order and never reused.
pub type RowId = i64;

/// A point in time, as stored alongside each log row.
///
/// The shipped clock uses Unix seconds. The sentinel [`Timestamp::UNBOUNDED`]
/// means "no restriction": used as an earliest bound it removes the lower
/// limit, used as a latest bound it removes the upper limit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// No restriction in the direction of the bound that holds it.
    pub const UNBOUNDED: Timestamp = Timestamp(-1);

    /// Create a timestamp from its raw value.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Check whether this is the `UNBOUNDED` sentinel.
    pub const fn is_unbounded(&self) -> bool {
        self.0 == Self::UNBOUNDED.0
    }

    /// Effective lower limit when this timestamp is an earliest bound.
    pub const fn as_lower(&self) -> i64 {
        if self.is_unbounded() {
            i64::MIN
        } else {
            self.0
        }
    }

    /// Effective upper limit when this timestamp is a latest bound.
    pub const fn as_upper(&self) -> i64 {
        if self.is_unbounded() {
            i64::MAX
        } else {
            self.0
        }
    }

    /// Half-open upper limit for an inclusive latest bound.
    ///
    /// Store queries cover `[from, to)`; a latest bound is inclusive, so the
    /// query limit is one past it. `UNBOUNDED` stays `UNBOUNDED`.
    pub const fn exclusive_upper(&self) -> Timestamp {
        if self.is_unbounded() {
            Self::UNBOUNDED
        } else {
            Timestamp(self.0.saturating_add(1))
        }
    }

    /// Shift by a signed number of units, never landing on the sentinel.
    pub fn offset(&self, delta: i64) -> Timestamp {
        let shifted = self.0.saturating_add(delta);
        Timestamp(shifted.max(0))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "unbounded")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self)
    }
}
