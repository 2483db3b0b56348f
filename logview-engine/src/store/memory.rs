//! In-memory store for tests and the simulator.
//!
//! Allows buffering entries, purging domains out of band, injecting
//! failures and counting calls for verification.

use super::{RowStore, StoreError};
use async_trait::async_trait;
use logview_types::{Entry, RowId, RowRange, Timestamp};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// In-memory row store.
///
/// Clones share the same rows, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug)]
struct MemoryStoreInner {
    rows: BTreeMap<RowId, Entry>,
    buffered: Vec<Entry>,
    next_row_id: RowId,
    unavailable: bool,
    fail_next_query: Option<String>,
    latency: Duration,
    range_queries: usize,
    persist_calls: usize,
}

impl Default for MemoryStoreInner {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            buffered: Vec::new(),
            next_row_id: 1,
            unavailable: false,
            fail_next_query: None,
            latency: Duration::ZERO,
            range_queries: 0,
            persist_calls: 0,
        }
    }
}

impl MemoryStore {
    /// Create an empty store whose first row id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose first row id is `first`.
    pub fn starting_at(first: RowId) -> Self {
        let store = Self::default();
        store.lock().next_row_id = first;
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Buffer a query from `localhost` that was not blocked.
    pub fn buffer(&self, timestamp: Timestamp, domain: &str) {
        self.buffer_entry(timestamp, domain, "localhost", false);
    }

    /// Buffer a query; it gets a row id on the next persist.
    pub fn buffer_entry(&self, timestamp: Timestamp, domain: &str, client: &str, blocked: bool) {
        self.lock().buffered.push(Entry {
            row_id: 0,
            timestamp,
            domain: domain.to_string(),
            client: client.to_string(),
            blocked,
        });
    }

    /// Buffer and immediately persist, bypassing the engine.
    ///
    /// Returns the assigned rows. Useful to seed a store before an engine
    /// is attached.
    pub fn seed(&self, timestamps: &[i64], domain: &str) -> Option<RowRange> {
        for &t in timestamps {
            self.buffer(Timestamp::new(t), domain);
        }
        self.lock().flush()
    }

    /// Delete every committed row for `domain`. Returns how many went.
    pub fn purge_domain(&self, domain: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.rows.len();
        inner.rows.retain(|_, entry| entry.domain != domain);
        before - inner.rows.len()
    }

    /// Number of committed rows.
    pub fn committed_len(&self) -> usize {
        self.lock().rows.len()
    }

    /// Number of buffered, not yet persisted entries.
    pub fn buffered_len(&self) -> usize {
        self.lock().buffered.len()
    }

    /// Make every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Cause the next `range_between()` to fail with the given error.
    pub fn fail_next_query(&self, error: &str) {
        self.lock().fail_next_query = Some(error.to_string());
    }

    /// Delay every call by `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// How many `range_between()` calls reached the store.
    pub fn range_query_count(&self) -> usize {
        self.lock().range_queries
    }

    /// How many `persist_buffered()` calls reached the store.
    pub fn persist_count(&self) -> usize {
        self.lock().persist_calls
    }

    /// Zero the call counters.
    pub fn reset_counters(&self) {
        let mut inner = self.lock();
        inner.range_queries = 0;
        inner.persist_calls = 0;
    }

    async fn delay(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl MemoryStoreInner {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    fn flush(&mut self) -> Option<RowRange> {
        if self.buffered.is_empty() {
            return None;
        }
        let first = self.next_row_id;
        for mut entry in std::mem::take(&mut self.buffered) {
            entry.row_id = self.next_row_id;
            self.rows.insert(entry.row_id, entry);
            self.next_row_id += 1;
        }
        RowRange::new(first, self.next_row_id - 1)
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn range_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        within: Option<RowRange>,
    ) -> Result<Option<RowRange>, StoreError> {
        self.delay().await;
        let mut inner = self.lock();
        inner.range_queries += 1;
        inner.check_available()?;

        // Check for forced failure
        if let Some(error) = inner.fail_next_query.take() {
            return Err(StoreError::Query(error));
        }

        let lower = from.as_lower();
        let upper = (!to.is_unbounded()).then(|| to.value());
        let rows = match within {
            Some(scope) => inner.rows.range(scope.start()..=scope.end()),
            None => inner.rows.range(..),
        };

        let mut matched: Option<RowRange> = None;
        for (&id, entry) in rows {
            let t = entry.timestamp.value();
            if t >= lower && upper.map_or(true, |u| t < u) {
                let row = RowRange::single(id);
                matched = Some(matched.map_or(row, |m| m.hull(&row)));
            }
        }
        Ok(matched)
    }

    async fn persist_buffered(&self) -> Result<Option<RowRange>, StoreError> {
        self.delay().await;
        let mut inner = self.lock();
        inner.persist_calls += 1;
        inner.check_available()?;
        Ok(inner.flush())
    }

    async fn rows_for_domain(
        &self,
        domain: Option<&str>,
        range: RowRange,
    ) -> Result<Vec<Entry>, StoreError> {
        self.delay().await;
        let inner = self.lock();
        inner.check_available()?;
        Ok(inner
            .rows
            .range(range.start()..=range.end())
            .map(|(_, entry)| entry)
            .filter(|entry| domain.map_or(true, |d| entry.domain == d))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logview_types::range;

    const U: Timestamp = Timestamp::UNBOUNDED;

    #[tokio::test]
    async fn empty_store_matches_nothing() {
        let store = MemoryStore::new();
        assert_eq!(store.range_between(U, U, None).await.unwrap(), None);
        assert_eq!(store.persist_buffered().await.unwrap(), None);
    }

    #[tokio::test]
    async fn persist_assigns_consecutive_ids() {
        let store = MemoryStore::new();
        for t in 0..5 {
            store.buffer(Timestamp::new(100 + t), "example.com");
        }
        assert_eq!(store.buffered_len(), 5);

        let persisted = store.persist_buffered().await.unwrap();
        assert_eq!(persisted, Some(range(1, 5)));
        assert_eq!(store.buffered_len(), 0);

        store.buffer(Timestamp::new(200), "example.org");
        assert_eq!(store.persist_buffered().await.unwrap(), Some(range(6, 6)));
    }

    #[tokio::test]
    async fn range_between_is_half_open() {
        let store = MemoryStore::new();
        store.seed(&[10, 20, 30, 40], "a.test");

        let found = store
            .range_between(Timestamp::new(20), Timestamp::new(40), None)
            .await
            .unwrap();
        assert_eq!(found, Some(range(2, 3)));
    }

    #[tokio::test]
    async fn unbounded_sides_remove_limits() {
        let store = MemoryStore::new();
        store.seed(&[10, 20, 30, 40], "a.test");

        let lower_open = store
            .range_between(U, Timestamp::new(25), None)
            .await
            .unwrap();
        assert_eq!(lower_open, Some(range(1, 2)));

        let upper_open = store
            .range_between(Timestamp::new(25), U, None)
            .await
            .unwrap();
        assert_eq!(upper_open, Some(range(3, 4)));
    }

    #[tokio::test]
    async fn within_scope_restricts_rows() {
        let store = MemoryStore::new();
        store.seed(&[10, 20, 30, 40], "a.test");

        let found = store
            .range_between(U, U, Some(range(2, 3)))
            .await
            .unwrap();
        assert_eq!(found, Some(range(2, 3)));
    }

    #[tokio::test]
    async fn starting_at_offsets_row_ids() {
        let store = MemoryStore::starting_at(10);
        assert_eq!(store.seed(&[1, 2], "a.test"), Some(range(10, 11)));
    }

    #[tokio::test]
    async fn purge_removes_only_that_domain() {
        let store = MemoryStore::new();
        store.seed(&[1, 2], "keep.test");
        store.seed(&[3], "drop.test");

        assert_eq!(store.purge_domain("drop.test"), 1);
        assert_eq!(store.committed_len(), 2);

        let rows = store.rows_for_domain(None, range(1, 3)).await.unwrap();
        assert!(rows.iter().all(|e| e.domain == "keep.test"));
    }

    #[tokio::test]
    async fn rows_for_domain_filters() {
        let store = MemoryStore::new();
        store.seed(&[1], "a.test");
        store.seed(&[2], "b.test");
        store.seed(&[3], "a.test");

        let rows = store
            .rows_for_domain(Some("a.test"), range(1, 3))
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|e| e.row_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn fail_next_query_fails_once() {
        let store = MemoryStore::new();
        store.fail_next_query("disk on fire");

        let err = store.range_between(U, U, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert!(store.range_between(U, U, None).await.is_ok());
    }

    #[tokio::test]
    async fn unavailable_store_fails_everything() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        assert!(matches!(
            store.persist_buffered().await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.range_between(U, U, None).await.is_err());
    }

    #[tokio::test]
    async fn counters_track_calls() {
        let store = MemoryStore::new();
        store.range_between(U, U, None).await.unwrap();
        store.persist_buffered().await.unwrap();
        store.persist_buffered().await.unwrap();

        assert_eq!(store.range_query_count(), 1);
        assert_eq!(store.persist_count(), 2);

        store.reset_counters();
        assert_eq!(store.range_query_count(), 0);
    }

    #[tokio::test]
    async fn clones_share_rows() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.seed(&[1], "a.test");
        assert_eq!(other.committed_len(), 1);
    }
}
