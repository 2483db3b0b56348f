//! Inclusive row-id intervals.

use crate::error::InvertedRange;
use crate::ids::RowId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive `[start, end]` interval of row ids.
///
/// A `RowRange` always holds at least one row (`start <= end`). "No matching
/// rows" is spelled `Option::<RowRange>::None`, never a special integer pair.
/// Deserializing an inverted pair fails rather than building one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRowRange")]
pub struct RowRange {
    start: RowId,
    end: RowId,
}

#[derive(Deserialize)]
struct RawRowRange {
    start: RowId,
    end: RowId,
}

impl TryFrom<RawRowRange> for RowRange {
    type Error = InvertedRange;

    fn try_from(raw: RawRowRange) -> Result<Self, Self::Error> {
        RowRange::new(raw.start, raw.end).ok_or(InvertedRange {
            start: raw.start,
            end: raw.end,
        })
    }
}

impl RowRange {
    /// Create a range, or `None` if `start > end`.
    pub fn new(start: RowId, end: RowId) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// A range holding exactly one row.
    pub fn single(id: RowId) -> Self {
        Self { start: id, end: id }
    }

    /// Every row id strictly before `id`, or `None` if there are none.
    pub fn before(id: RowId) -> Option<Self> {
        Self::new(RowId::MIN, id.checked_sub(1)?)
    }

    /// Every row id strictly after `id`, or `None` if there are none.
    pub fn after(id: RowId) -> Option<Self> {
        Self::new(id.checked_add(1)?, RowId::MAX)
    }

    /// First row id in the range.
    pub fn start(&self) -> RowId {
        self.start
    }

    /// Last row id in the range.
    pub fn end(&self) -> RowId {
        self.end
    }

    /// Number of row ids covered.
    pub fn len(&self) -> u64 {
        (self.end as i128 - self.start as i128 + 1) as u64
    }

    /// Always false; present for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check whether `id` lies inside the range.
    pub fn contains(&self, id: RowId) -> bool {
        self.start <= id && id <= self.end
    }

    /// Smallest range covering both `self` and `other`.
    pub fn hull(&self, other: &RowRange) -> RowRange {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Intersection of two ranges, if they overlap.
    pub fn intersect(&self, other: &RowRange) -> Option<RowRange> {
        Self::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Drop every row up to and including `id` from the front.
    ///
    /// Returns `None` when nothing is left.
    pub fn trim_front_through(&self, id: RowId) -> Option<RowRange> {
        if id < self.start {
            return Some(*self);
        }
        Self::new(id.checked_add(1)?, self.end)
    }

    /// Drop every row from `id` onwards from the back.
    ///
    /// Returns `None` when nothing is left.
    pub fn trim_back_from(&self, id: RowId) -> Option<RowRange> {
        if id > self.end {
            return Some(*self);
        }
        Self::new(self.start, id.checked_sub(1)?)
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.start, self.end)
    }
}

impl fmt::Debug for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowRange{}", self)
    }
}

/// Shorthand used heavily in tests: `range(10, 50)` is `[10,50]`.
///
/// Only built for this crate's tests and under the `test-util` feature.
///
/// # Panics
///
/// Panics if `start > end`.
#[cfg(any(test, feature = "test-util"))]
pub fn range(start: RowId, end: RowId) -> RowRange {
    RowRange::new(start, end).expect("range start must not exceed end")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_pair_is_absent() {
        assert!(RowRange::new(5, 4).is_none());
        assert_eq!(RowRange::new(4, 4), Some(RowRange::single(4)));
    }

    #[test]
    fn len_is_inclusive() {
        assert_eq!(range(1, 5).len(), 5);
        assert_eq!(RowRange::single(9).len(), 1);
    }

    #[test]
    fn before_and_after_scopes() {
        let before = RowRange::before(10).unwrap();
        assert_eq!(before.end(), 9);
        assert!(!before.contains(10));

        let after = RowRange::after(10).unwrap();
        assert_eq!(after.start(), 11);
        assert!(RowRange::after(RowId::MAX).is_none());
        assert!(RowRange::before(RowId::MIN).is_none());
    }

    #[test]
    fn hull_covers_both() {
        assert_eq!(range(10, 20).hull(&range(30, 40)), range(10, 40));
        assert_eq!(range(10, 50).hull(&range(12, 13)), range(10, 50));
    }

    #[test]
    fn intersect_requires_overlap() {
        assert_eq!(range(1, 10).intersect(&range(5, 20)), Some(range(5, 10)));
        assert_eq!(range(1, 4).intersect(&range(5, 20)), None);
    }

    #[test]
    fn trim_front() {
        assert_eq!(range(10, 50).trim_front_through(20), Some(range(21, 50)));
        assert_eq!(range(10, 50).trim_front_through(50), None);
        assert_eq!(range(10, 50).trim_front_through(5), Some(range(10, 50)));
    }

    #[test]
    fn trim_back() {
        assert_eq!(range(10, 50).trim_back_from(41), Some(range(10, 40)));
        assert_eq!(range(10, 50).trim_back_from(10), None);
        assert_eq!(range(10, 50).trim_back_from(60), Some(range(10, 50)));
    }

    #[test]
    fn display_is_bracketed() {
        assert_eq!(range(1, 5).to_string(), "[1,5]");
    }

    #[test]
    fn deserialize_accepts_ordered_pair() {
        let parsed: RowRange = serde_json::from_str(r#"{"start":3,"end":7}"#).unwrap();
        assert_eq!(parsed, range(3, 7));

        let single: RowRange = serde_json::from_str(r#"{"start":4,"end":4}"#).unwrap();
        assert_eq!(single, RowRange::single(4));
    }

    #[test]
    fn deserialize_rejects_inverted_pair() {
        let err = serde_json::from_str::<RowRange>(r#"{"start":5,"end":1}"#).unwrap_err();
        assert!(
            err.to_string().contains("range start 5 is after end 1"),
            "unexpected error: {err}"
        );
    }
}
