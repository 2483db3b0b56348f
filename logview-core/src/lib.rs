//! # logview-core
//!
//! Pure logic for logview (no I/O, instant tests).
//!
//! The engine in `logview-engine` owns a store, a clock and a set of
//! observers. Every decision it takes about *what* to query and *how* a
//! query answer changes the visible range lives here instead:
//! - [`PauseCounter`] - reentrant suppression of synchronization
//! - [`SyncThrottle`] - minimum spacing between passes
//! - [`plan_earliest`] / [`plan_latest`] - bound reconciliation
//! - [`FilterTransition`] - bound ordering on filter change

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pause;
pub mod reconcile;
pub mod throttle;
pub mod transition;

pub use pause::PauseCounter;
pub use reconcile::{
    extend_with_persisted, plan_earliest, plan_latest, RangeQuery, ReconcilePlan, Reconciled,
};
pub use throttle::{SyncThrottle, DEFAULT_MIN_SPACING};
pub use transition::FilterTransition;
