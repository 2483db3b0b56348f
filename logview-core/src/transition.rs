//! Ordering of bound updates when the whole filter changes.
//!
//! Both bounds of a new filter are applied one after the other. Applying
//! them in the right order keeps observers from seeing a transient empty
//! window: when the window grows or slides back, the earliest bound goes
//! first; when it slides forward, the latest bound goes first.

use logview_types::{Bound, Filter, FilterKind, Timestamp};

/// A pending switch from the applied bounds to a new filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterTransition {
    /// Applied earliest bound before the switch.
    pub from_earliest: Timestamp,
    /// Applied latest bound before the switch.
    pub from_latest: Timestamp,
    /// Earliest bound to apply (rolling windows already resolved).
    pub to_earliest: Timestamp,
    /// Latest bound to apply.
    pub to_latest: Timestamp,
    /// Kind of the new filter.
    pub kind: FilterKind,
}

impl FilterTransition {
    /// Describe the switch to `next`, resolving rolling windows at `now`.
    pub fn new(earliest: Timestamp, latest: Timestamp, next: &Filter, now: Timestamp) -> Self {
        Self {
            from_earliest: earliest,
            from_latest: latest,
            to_earliest: next.effective_earliest(now),
            to_latest: next.latest,
            kind: next.kind,
        }
    }

    /// The order in which the two bounds must be applied.
    pub fn order(&self) -> [Bound; 2] {
        if self.to_earliest.as_lower() <= self.from_earliest.as_lower() {
            [Bound::Earliest, Bound::Latest]
        } else {
            [Bound::Latest, Bound::Earliest]
        }
    }

    /// Check whether applying the transition moves either bound.
    pub fn is_noop(&self) -> bool {
        self.from_earliest == self.to_earliest && self.from_latest == self.to_latest
    }
}
