//! Minimum spacing between synchronization passes.
//!
//! The throttle is pure: callers pass in the current instant, which keeps
//! the clock under test control.

use std::time::{Duration, Instant};

/// Default minimum spacing between passes.
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_secs(1);

/// Remembers when the last pass started and refuses passes inside the window.
#[derive(Debug, Clone)]
pub struct SyncThrottle {
    min_spacing: Duration,
    last: Option<Instant>,
}

impl SyncThrottle {
    /// Create a throttle with the given spacing.
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last: None,
        }
    }

    /// Claim a pass at `now`.
    ///
    /// Returns `true` and stamps the clock when the window has elapsed,
    /// `false` (leaving the stamp untouched) otherwise.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if !self.is_open(now) {
            return false;
        }
        self.last = Some(now);
        true
    }

    /// Check whether a pass at `now` would be allowed.
    pub fn is_open(&self, now: Instant) -> bool {
        match self.last {
            Some(last) => now.saturating_duration_since(last) >= self.min_spacing,
            None => true,
        }
    }

    /// Time left until the window reopens.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => self
                .min_spacing
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// When the last pass was claimed.
    pub fn last_sync(&self) -> Option<Instant> {
        self.last
    }

    /// The configured spacing.
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }
}

impl Default for SyncThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPACING)
    }
}
