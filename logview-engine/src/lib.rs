//! # logview-engine
//!
//! Live row-range synchronization for a DNS query log viewer.
//!
//! The log is an append-only table of rows with increasing ids. A viewer
//! shows the rows whose timestamp falls inside a user filter; this crate
//! keeps that "visible range" up to date as rows are persisted, the filter
//! changes, time passes or rows are purged, and tells observers exactly
//! which rows came and went.
//!
//! ## Features
//!
//! - **Delta events**: insert/remove/reset/partial-remove, never a re-scan
//! - **Store abstraction**: pluggable [`RowStore`] (in-memory store included)
//! - **Weak observers**: registering never keeps an observer alive
//! - **Pure core**: uses logview-core for side-effect-free planning
//!
//! ## Example
//!
//! ```ignore
//! use logview_engine::{ChannelObserver, EngineConfig, FilterPreferences, MemoryStore, SyncEngine};
//!
//! let prefs = FilterPreferences::default();
//! let engine = SyncEngine::spawn(EngineConfig::default(), MemoryStore::new(), prefs.subscribe()).await;
//!
//! let (observer, mut events) = ChannelObserver::new();
//! engine.add_observer(&observer);
//! engine.request_sync(None);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod executor;
pub mod observer;
pub mod preferences;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig, SyncConfig};
pub use engine::{EngineBuilder, OnDone, SyncEngine, SyncOutcome};
pub use executor::Background;
pub use observer::{ChannelObserver, ObserverId, ObserverRegistry, RangeObserver};
pub use preferences::FilterPreferences;
pub use store::{MemoryStore, RowStore, StoreError};

pub use logview_types::{
    Bound, Entry, Filter, FilterError, FilterKind, InvertedRange, RangeEvent, RowId, RowRange,
    Timestamp,
};
