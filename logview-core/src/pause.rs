//! Reentrant pause counter.
//!
//! Synchronization is suppressed while the depth is above zero. Pauses nest;
//! every `pause()` must be balanced by a `resume()` by the caller. The
//! counter does not enforce balance: an excess of pauses keeps the engine
//! paused until `force_activate()`, and an excess of resumes is ignored.

/// Counts outstanding pauses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseCounter {
    depth: u32,
}

impl PauseCounter {
    /// Create an active (unpaused) counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one pause level. Returns the new depth.
    pub fn pause(&mut self) -> u32 {
        self.depth = self.depth.saturating_add(1);
        self.depth
    }

    /// Remove one pause level, never going below zero. Returns the new depth.
    pub fn resume(&mut self) -> u32 {
        self.depth = self.depth.saturating_sub(1);
        self.depth
    }

    /// Drop every outstanding pause.
    pub fn force_activate(&mut self) {
        self.depth = 0;
    }

    /// Current depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Check whether synchronization is suppressed.
    pub fn is_paused(&self) -> bool {
        self.depth > 0
    }
}
