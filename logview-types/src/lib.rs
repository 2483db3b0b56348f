//! # logview-types
//!
//! Value types shared by every logview crate:
//! - [`Timestamp`], [`RowId`] - ordering of log rows
//! - [`RowRange`] - inclusive row-id intervals (absence is `Option::None`)
//! - [`Filter`], [`FilterKind`] - the user's time-window filter
//! - [`RangeEvent`], [`Bound`] - deltas published to observers
//! - [`Entry`] - a materialized DNS query row

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entry;
mod error;
mod event;
mod filter;
mod ids;
mod range;

pub use entry::Entry;
pub use error::{FilterError, InvertedRange};
pub use event::{Bound, RangeEvent};
pub use filter::{Filter, FilterKind};
pub use ids::{RowId, Timestamp};
pub use range::RowRange;

#[cfg(any(test, feature = "test-util"))]
pub use range::range;
