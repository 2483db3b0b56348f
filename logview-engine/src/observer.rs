//! Observers of the visible row range.
//!
//! Observers are held weakly: registering with the engine never keeps an
//! observer (or whatever owns it) alive. Each registration returns an
//! [`ObserverId`] that can be used to unregister explicitly; dead handles are
//! pruned on every registration change.
//!
//! Callbacks run on the engine's background executor. An observer that
//! drives a UI must hop to its own thread before touching UI state.

use logview_types::{Bound, RangeEvent, RowRange};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Receives range deltas from the engine.
pub trait RangeObserver: Send + Sync {
    /// Drop everything and reload `range` (`None`: nothing is visible).
    fn on_reset(&self, range: Option<RowRange>);

    /// Rows entered the visible range.
    fn on_insert(&self, range: RowRange, affects: Option<Bound>);

    /// Rows left the visible range.
    fn on_remove(&self, range: RowRange, affects: Bound);

    /// Rows for `domain` were purged; re-check anything showing it.
    fn on_partial_remove(&self, domain: &str);
}

/// Invoke the callback matching `event`.
pub fn deliver(observer: &dyn RangeObserver, event: &RangeEvent) {
    match event {
        RangeEvent::Reset { range } => observer.on_reset(*range),
        RangeEvent::Insert { range, affects } => observer.on_insert(*range, *affects),
        RangeEvent::Remove { range, affects } => observer.on_remove(*range, *affects),
        RangeEvent::PartialRemove { domain } => observer.on_partial_remove(domain),
    }
}

/// Registration token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Ordered list of weakly held observers.
///
/// Registration order is notification order.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    entries: Vec<(ObserverId, Weak<dyn RangeObserver>)>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer, pruning dead ones first.
    pub fn register(&mut self, observer: Weak<dyn RangeObserver>) -> ObserverId {
        self.prune();
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        self.prune();
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Drop every observer whose owner is gone. Returns how many went.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, weak)| weak.strong_count() > 0);
        before - self.entries.len()
    }

    /// Strong handles to the observers still alive, in registration order.
    pub fn live(&self) -> Vec<Arc<dyn RangeObserver>> {
        self.entries
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }

    /// Number of observers still alive.
    pub fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Number of entries, dead ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("entries", &self.entries.len())
            .field("live", &self.live_count())
            .finish()
    }
}

/// Observer that forwards every event into a channel.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RangeEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<RangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn forward(&self, event: RangeEvent) {
        // A closed receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl RangeObserver for ChannelObserver {
    fn on_reset(&self, range: Option<RowRange>) {
        self.forward(RangeEvent::Reset { range });
    }

    fn on_insert(&self, range: RowRange, affects: Option<Bound>) {
        self.forward(RangeEvent::Insert { range, affects });
    }

    fn on_remove(&self, range: RowRange, affects: Bound) {
        self.forward(RangeEvent::Remove { range, affects });
    }

    fn on_partial_remove(&self, domain: &str) {
        self.forward(RangeEvent::PartialRemove {
            domain: domain.to_string(),
        });
    }
}
