//! Error types for logview value types.

use crate::ids::{RowId, Timestamp};
use thiserror::Error;

/// A filter that violates its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Earliest bound lies after the latest bound.
    #[error("earliest bound {earliest} is after latest bound {latest}")]
    InvertedBounds {
        /// Offending earliest bound.
        earliest: Timestamp,
        /// Offending latest bound.
        latest: Timestamp,
    },

    /// Rolling window with a zero-minute duration.
    #[error("rolling window must span at least one minute")]
    EmptyWindow,
}

/// A row range whose start lies after its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("range start {start} is after end {end}")]
pub struct InvertedRange {
    /// Offending start.
    pub start: RowId,
    /// Offending end.
    pub end: RowId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FilterError::InvertedBounds {
            earliest: Timestamp::new(20),
            latest: Timestamp::new(10),
        };
        assert_eq!(err.to_string(), "earliest bound 20 is after latest bound 10");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FilterError>();
        assert_send_sync::<InvertedRange>();
    }
}
