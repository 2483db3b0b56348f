//! Store port for logview.
//!
//! The engine never owns the query log. It talks to it through [`RowStore`],
//! which answers "which rows fall in this time span" and "flush what you
//! buffered". Implementations are expected to block on disk I/O; the engine
//! only ever calls them from its background executor.
//!
//! # Example
//!
//! ```ignore
//! let store = MemoryStore::new();
//! store.buffer(Timestamp::new(100), "example.com");
//! let persisted = store.persist_buffered().await?;
//! let found = store.range_between(Timestamp::UNBOUNDED, Timestamp::UNBOUNDED, None).await?;
//! ```

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use logview_types::{Entry, RowRange, Timestamp};
use thiserror::Error;

/// Store errors.
///
/// The engine treats every variant the same way: the operation that needed
/// the store emits nothing and the failure is logged.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but the query failed.
    #[error("query failed: {0}")]
    Query(String),
}

/// Access to the timestamp-ordered query log.
#[async_trait]
pub trait RowStore: Send + Sync + 'static {
    /// Row range of entries with timestamp in `[from, to)`.
    ///
    /// `from == UNBOUNDED` removes the lower limit, `to == UNBOUNDED` the
    /// upper one. `within` restricts the answer to rows inside that range.
    /// Returns `Ok(None)` when no rows match.
    async fn range_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        within: Option<RowRange>,
    ) -> Result<Option<RowRange>, StoreError>;

    /// Flush buffered entries and return the rows they now occupy.
    ///
    /// Returns `Ok(None)` when nothing was buffered.
    async fn persist_buffered(&self) -> Result<Option<RowRange>, StoreError>;

    /// Materialize the rows of `range`, optionally only those for `domain`.
    ///
    /// Consumer-facing; the engine itself never reads rows.
    async fn rows_for_domain(
        &self,
        domain: Option<&str>,
        range: RowRange,
    ) -> Result<Vec<Entry>, StoreError>;
}
