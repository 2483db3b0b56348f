//! Deltas published to range observers.

use crate::range::RowRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which filter bound a delta was caused by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// The front of the window (oldest rows).
    Earliest,
    /// The back of the window (newest rows).
    Latest,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Earliest => write!(f, "earliest"),
            Bound::Latest => write!(f, "latest"),
        }
    }
}

/// A single change to the visible row range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RangeEvent {
    /// Discard everything and reload from this range.
    Reset {
        /// The full visible range, `None` when nothing matches.
        range: Option<RowRange>,
    },
    /// Rows entered the visible range.
    Insert {
        /// The inserted rows.
        range: RowRange,
        /// Bound responsible, `None` for newly persisted rows.
        affects: Option<Bound>,
    },
    /// Rows left the visible range.
    Remove {
        /// The removed rows.
        range: RowRange,
        /// Bound responsible.
        affects: Bound,
    },
    /// Rows for a domain were purged out of band; consumers re-check.
    PartialRemove {
        /// The purged domain.
        domain: String,
    },
}

impl RangeEvent {
    /// Short name of the event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RangeEvent::Reset { .. } => "reset",
            RangeEvent::Insert { .. } => "insert",
            RangeEvent::Remove { .. } => "remove",
            RangeEvent::PartialRemove { .. } => "partial_remove",
        }
    }
}

impl fmt::Display for RangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeEvent::Reset { range: Some(r) } => write!(f, "reset {}", r),
            RangeEvent::Reset { range: None } => write!(f, "reset (empty)"),
            RangeEvent::Insert {
                range,
                affects: Some(b),
            } => write!(f, "insert {} ({})", range, b),
            RangeEvent::Insert {
                range,
                affects: None,
            } => write!(f, "insert {}", range),
            RangeEvent::Remove { range, affects } => write!(f, "remove {} ({})", range, affects),
            RangeEvent::PartialRemove { domain } => write!(f, "partial remove {}", domain),
        }
    }
}
