//! Time-window filter applied to the query log.

use crate::error::FilterError;
use crate::ids::Timestamp;
use serde::{Deserialize, Serialize};

/// Seconds per rolling-window minute.
const SECS_PER_MINUTE: i64 = 60;

/// How the filter's bounds are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    /// Fixed `[earliest, latest]` interval chosen by the user.
    AbsoluteRange,
    /// Everything from `now - minutes` onwards, re-evaluated every tick.
    RollingWindow {
        /// Window length in minutes.
        minutes: u32,
    },
    /// No restriction at all.
    Unbounded,
}

/// User-configured time-window filter.
///
/// Invariant: `earliest <= latest` unless either is [`Timestamp::UNBOUNDED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Interpretation of the bounds.
    #[serde(flatten)]
    pub kind: FilterKind,
    /// Inclusive lower bound, `UNBOUNDED` for none.
    pub earliest: Timestamp,
    /// Inclusive upper bound, `UNBOUNDED` for none.
    pub latest: Timestamp,
}

impl Filter {
    /// A filter that lets every row through.
    pub const fn unbounded() -> Self {
        Self {
            kind: FilterKind::Unbounded,
            earliest: Timestamp::UNBOUNDED,
            latest: Timestamp::UNBOUNDED,
        }
    }

    /// A fixed interval. Either side may be `UNBOUNDED`.
    pub fn absolute(earliest: Timestamp, latest: Timestamp) -> Result<Self, FilterError> {
        let filter = Self {
            kind: FilterKind::AbsoluteRange,
            earliest,
            latest,
        };
        filter.validate()?;
        Ok(filter)
    }

    /// A rolling window of `minutes`, anchored at `now`.
    pub fn rolling(minutes: u32, now: Timestamp) -> Result<Self, FilterError> {
        if minutes == 0 {
            return Err(FilterError::EmptyWindow);
        }
        let kind = FilterKind::RollingWindow { minutes };
        Ok(Self {
            kind,
            earliest: window_start(minutes, now),
            latest: Timestamp::UNBOUNDED,
        })
    }

    /// Check the bound-ordering invariant.
    pub fn validate(&self) -> Result<(), FilterError> {
        if let FilterKind::RollingWindow { minutes: 0 } = self.kind {
            return Err(FilterError::EmptyWindow);
        }
        if !self.earliest.is_unbounded()
            && !self.latest.is_unbounded()
            && self.earliest > self.latest
        {
            return Err(FilterError::InvertedBounds {
                earliest: self.earliest,
                latest: self.latest,
            });
        }
        Ok(())
    }

    /// Check whether this is a rolling window.
    pub fn is_rolling(&self) -> bool {
        matches!(self.kind, FilterKind::RollingWindow { .. })
    }

    /// Check whether this is an absolute range.
    pub fn is_absolute(&self) -> bool {
        matches!(self.kind, FilterKind::AbsoluteRange)
    }

    /// The earliest bound as of `now`.
    ///
    /// Rolling windows recompute it from the wall clock; other kinds return
    /// the stored bound.
    pub fn effective_earliest(&self, now: Timestamp) -> Timestamp {
        match self.kind {
            FilterKind::RollingWindow { minutes } => window_start(minutes, now),
            FilterKind::AbsoluteRange | FilterKind::Unbounded => self.earliest,
        }
    }

    /// Copy of this filter with rolling bounds resolved against `now`.
    pub fn resolved(&self, now: Timestamp) -> Self {
        Self {
            earliest: self.effective_earliest(now),
            ..*self
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::unbounded()
    }
}

fn window_start(minutes: u32, now: Timestamp) -> Timestamp {
    now.offset(-(i64::from(minutes) * SECS_PER_MINUTE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_has_sentinels_on_both_sides() {
        let f = Filter::unbounded();
        assert!(f.earliest.is_unbounded());
        assert!(f.latest.is_unbounded());
        assert!(f.validate().is_ok());
    }

    #[test]
    fn absolute_rejects_inverted_bounds() {
        let err = Filter::absolute(Timestamp::new(20), Timestamp::new(10)).unwrap_err();
        assert!(matches!(err, FilterError::InvertedBounds { .. }));
    }

    #[test]
    fn absolute_allows_one_open_side() {
        assert!(Filter::absolute(Timestamp::new(20), Timestamp::UNBOUNDED).is_ok());
        assert!(Filter::absolute(Timestamp::UNBOUNDED, Timestamp::new(10)).is_ok());
    }

    #[test]
    fn rolling_window_tracks_the_clock() {
        let f = Filter::rolling(5, Timestamp::new(1_000)).unwrap();
        assert_eq!(f.earliest, Timestamp::new(700));
        assert!(f.latest.is_unbounded());
        assert_eq!(f.effective_earliest(Timestamp::new(1_060)), Timestamp::new(760));
    }

    #[test]
    fn rolling_window_of_zero_minutes_is_rejected() {
        assert!(matches!(
            Filter::rolling(0, Timestamp::new(1_000)),
            Err(FilterError::EmptyWindow)
        ));
    }

    #[test]
    fn absolute_ignores_the_clock() {
        let f = Filter::absolute(Timestamp::new(5), Timestamp::new(9)).unwrap();
        assert_eq!(f.effective_earliest(Timestamp::new(1_000_000)), Timestamp::new(5));
    }

    #[test]
    fn serde_uses_tagged_kind() {
        let f = Filter::rolling(15, Timestamp::new(10_000)).unwrap();
        let json = serde_json::to_value(f).unwrap();
        assert_eq!(json["kind"], "rolling_window");
        assert_eq!(json["minutes"], 15);

        let back: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(back, f);
    }
}
