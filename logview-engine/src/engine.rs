//! SyncEngine - the live row-range tracker for logview.
//!
//! This module provides [`SyncEngine`], which keeps a cached "visible range"
//! of the query log consistent with the store and the user's filter, and
//! tells observers exactly which rows came and went.
//!
//! # Architecture
//!
//! The engine uses pure planning (from logview-core) for every decision and
//! interprets the plans against the store via the [`RowStore`] trait.
//!
//! ```text
//! filter change ─┐                        ┌─► observer 1
//! store mutation ├─► SyncEngine ─► deltas ├─► observer 2
//! timer tick ────┘       ↓                └─► ...
//!                   logview-core (pure planning)
//!                        ↓
//!                    RowStore
//! ```
//!
//! # Execution contexts
//!
//! Every store query and every observer callback runs on the engine's
//! [`Background`] executor, whoever awaits the `async` methods: they hand
//! their work to the executor and wait for it. A UI thread that must not
//! block uses the fire-and-forget methods
//! ([`SyncEngine::request_sync`], [`SyncEngine::request_reload`],
//! [`SyncEngine::add_observer`]) and the snapshot getters.
//!
//! # Pause contract
//!
//! [`SyncEngine::pause`] and [`SyncEngine::resume`] must be balanced by the
//! caller. An unbalanced pause keeps the periodic trigger silent until
//! [`SyncEngine::start`] or [`SyncEngine::force_activate`].
//!
//! # Single flight
//!
//! State-changing passes (sync, filter reconciliation, reload) run under one
//! per-engine gate. `sync_now` never waits for it: a call that finds a pass
//! in flight is treated like a throttled call. Filter changes and reloads
//! queue behind the running pass.
//!
//! # Example
//!
//! ```ignore
//! use logview_engine::{ChannelObserver, EngineConfig, FilterPreferences, MemoryStore, SyncEngine};
//!
//! let prefs = FilterPreferences::default();
//! let engine = SyncEngine::spawn(EngineConfig::default(), MemoryStore::new(), prefs.subscribe()).await;
//!
//! let (observer, mut events) = ChannelObserver::new();
//! engine.add_observer(&observer);
//! while let Some(event) = events.recv().await {
//!     println!("{event}");
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use logview_core::{
    extend_with_persisted, plan_earliest, plan_latest, FilterTransition, PauseCounter, Reconciled,
    SyncThrottle,
};
use logview_types::{Bound, Filter, FilterError, FilterKind, RangeEvent, RowRange, Timestamp};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::executor::Background;
use crate::observer::{deliver, ObserverId, ObserverRegistry, RangeObserver};
use crate::store::{RowStore, StoreError};

/// Completion callback for [`SyncEngine::sync_now`].
pub type OnDone = Box<dyn FnOnce() + Send + 'static>;

/// What a call to [`SyncEngine::sync_now`] or [`SyncEngine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A full pass ran.
    Performed,
    /// Skipped: the previous pass started less than the minimum spacing ago.
    Throttled,
    /// Skipped: another pass was running.
    InFlight,
    /// Skipped: the engine is paused (periodic trigger only).
    Paused,
    /// Not run: the background executor shut down first.
    Cancelled,
}

struct EngineState {
    tracked: Option<RowRange>,
    earliest: Timestamp,
    latest: Timestamp,
    kind: FilterKind,
    pause: PauseCounter,
    throttle: SyncThrottle,
    observers: ObserverRegistry,
}

impl EngineState {
    fn bound(&self, bound: Bound) -> Timestamp {
        match bound {
            Bound::Earliest => self.earliest,
            Bound::Latest => self.latest,
        }
    }

    fn set_bound(&mut self, bound: Bound, value: Timestamp) {
        match bound {
            Bound::Earliest => self.earliest = value,
            Bound::Latest => self.latest = value,
        }
    }
}

struct Inner<S> {
    store: S,
    clock: Arc<dyn Clock>,
    background: Background,
    config: EngineConfig,
    state: Mutex<EngineState>,
    pass_gate: AsyncMutex<()>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl<S> Drop for Inner<S> {
    fn drop(&mut self) {
        for slot in [&mut self.ticker, &mut self.watcher] {
            let task = slot.get_mut().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(task) = task {
                task.abort();
            }
        }
    }
}

/// Builder for [`SyncEngine`].
pub struct EngineBuilder<S> {
    store: S,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    filters: Option<watch::Receiver<Filter>>,
    background: Option<Background>,
    autostart: bool,
}

impl<S: RowStore> EngineBuilder<S> {
    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `clock` for rolling windows instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Follow this filter source. Without one the filter stays unbounded.
    pub fn filters(mut self, filters: watch::Receiver<Filter>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Run engine work on `background` instead of the current runtime.
    pub fn background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    /// Whether to start the periodic trigger right away (default: true).
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Load the filter, compute the initial range and run one pass.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime when no background executor was set.
    pub async fn spawn(self) -> SyncEngine<S> {
        let background = self.background.unwrap_or_else(Background::current);
        let mut filters = self
            .filters
            .unwrap_or_else(|| watch::channel(Filter::unbounded()).1);

        let filter = *filters.borrow_and_update();
        let state = EngineState {
            tracked: None,
            earliest: filter.effective_earliest(self.clock.now()),
            latest: filter.latest,
            kind: filter.kind,
            pause: PauseCounter::new(),
            throttle: SyncThrottle::new(self.config.sync.min_spacing()),
            observers: ObserverRegistry::new(),
        };
        let engine = SyncEngine {
            inner: Arc::new(Inner {
                store: self.store,
                clock: self.clock,
                background,
                config: self.config,
                state: Mutex::new(state),
                pass_gate: AsyncMutex::new(()),
                ticker: Mutex::new(None),
                watcher: Mutex::new(None),
            }),
        };

        let init = engine.clone();
        engine
            .on_background("initial pass", async move {
                init.load_initial_range().await;
                init.sync_pass(None).await;
            })
            .await;
        info!(
            earliest = %engine.current_earliest(),
            latest = %engine.current_latest(),
            tracked = ?engine.rows(),
            "sync engine created"
        );

        engine.watch_filters(filters);
        if self.autostart {
            engine.start();
        }
        engine
    }
}

/// Keeps the visible row range in step with the store and the filter.
///
/// Cloning is cheap; clones share one engine. The periodic trigger stops
/// once the last clone is dropped.
pub struct SyncEngine<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for SyncEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RowStore> SyncEngine<S> {
    /// Start configuring an engine over `store`.
    pub fn builder(store: S) -> EngineBuilder<S> {
        EngineBuilder {
            store,
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
            filters: None,
            background: None,
            autostart: true,
        }
    }

    /// Create an engine on the current runtime with the system clock.
    pub async fn spawn(config: EngineConfig, store: S, filters: watch::Receiver<Filter>) -> Self {
        Self::builder(store)
            .config(config)
            .filters(filters)
            .spawn()
            .await
    }

    // --- Pause / resume ---

    /// Clear every pause and make sure the periodic trigger is running.
    pub fn start(&self) {
        self.force_activate();
        self.spawn_ticker();
    }

    /// Stop the periodic trigger. Explicit calls keep working.
    pub fn stop(&self) {
        if let Some(task) = lock(&self.inner.ticker).take() {
            task.abort();
            info!("periodic sync stopped");
        }
    }

    /// Suppress the periodic trigger. Must be balanced by [`Self::resume`].
    pub fn pause(&self) -> u32 {
        self.with_state(|s| s.pause.pause())
    }

    /// Undo one [`Self::pause`]. Extra resumes are ignored.
    pub fn resume(&self) -> u32 {
        self.with_state(|s| s.pause.resume())
    }

    /// Drop every outstanding pause.
    pub fn force_activate(&self) {
        self.with_state(|s| s.pause.force_activate());
    }

    /// Current pause depth.
    pub fn pause_depth(&self) -> u32 {
        self.with_state(|s| s.pause.depth())
    }

    /// Check whether the periodic trigger is suppressed.
    pub fn is_paused(&self) -> bool {
        self.with_state(|s| s.pause.is_paused())
    }

    // --- Snapshots ---

    /// The visible row range, `None` when nothing matches the filter.
    pub fn rows(&self) -> Option<RowRange> {
        self.with_state(|s| s.tracked)
    }

    /// The applied earliest bound.
    pub fn current_earliest(&self) -> Timestamp {
        self.with_state(|s| s.earliest)
    }

    /// The applied latest bound.
    pub fn current_latest(&self) -> Timestamp {
        self.with_state(|s| s.latest)
    }

    /// Kind of the applied filter.
    pub fn filter_kind(&self) -> FilterKind {
        self.with_state(|s| s.kind)
    }

    /// The store this engine reconciles against.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// The executor engine work runs on.
    pub fn background(&self) -> &Background {
        &self.inner.background
    }

    // --- Synchronization ---
    //
    // Every async entry point below hops to the background executor and
    // waits for it there; the `*_pass` internals assume they already run on it.

    /// What the periodic trigger runs: a sync pass unless paused.
    pub async fn tick(&self) -> SyncOutcome {
        let engine = self.clone();
        self.on_background("tick", async move { engine.tick_pass().await })
            .await
            .unwrap_or(SyncOutcome::Cancelled)
    }

    /// Persist buffered rows and bring the visible range up to date.
    ///
    /// Safe to call often: passes closer together than the configured
    /// minimum spacing, or overlapping a running pass, are skipped. The pass
    /// and `on_done` always run on the background executor, whether or not
    /// a pass ran.
    pub async fn sync_now(&self, on_done: Option<OnDone>) -> SyncOutcome {
        let engine = self.clone();
        self.on_background("sync", async move { engine.sync_pass(on_done).await })
            .await
            .unwrap_or(SyncOutcome::Cancelled)
    }

    /// Fire-and-forget [`Self::sync_now`], callable from any thread.
    pub fn request_sync(&self, on_done: Option<OnDone>) -> JoinHandle<SyncOutcome> {
        let engine = self.clone();
        self.inner
            .background
            .spawn(async move { engine.sync_pass(on_done).await })
    }

    // --- Reconciliation ---

    /// Move the earliest bound to `value`, publishing the resulting delta.
    pub async fn apply_earliest(&self, value: Timestamp) {
        let engine = self.clone();
        self.on_background("apply earliest", async move {
            engine.bound_pass(Bound::Earliest, value).await
        })
        .await;
    }

    /// Move the latest bound to `value`, publishing the resulting delta.
    pub async fn apply_latest(&self, value: Timestamp) {
        let engine = self.clone();
        self.on_background("apply latest", async move {
            engine.bound_pass(Bound::Latest, value).await
        })
        .await;
    }

    /// Switch to `filter`, moving both bounds in the order that avoids a
    /// transient empty window.
    pub async fn apply_filter(&self, filter: Filter) -> Result<(), FilterError> {
        filter.validate()?;
        let engine = self.clone();
        self.on_background("apply filter", async move { engine.filter_pass(filter).await })
            .await
            .unwrap_or(Ok(()))
    }

    // --- External mutations ---

    /// Recompute the visible range after an out-of-band store mutation.
    ///
    /// With a `domain`, observers get a partial remove for it and decide
    /// themselves whether their rows are affected; without, they get a
    /// full reset.
    pub async fn needs_reload(&self, domain: Option<&str>) {
        let engine = self.clone();
        let domain = domain.map(str::to_owned);
        self.on_background("reload", async move { engine.reload_pass(domain).await })
            .await;
    }

    /// Fire-and-forget [`Self::needs_reload`], callable from any thread.
    pub fn request_reload(&self, domain: Option<String>) -> JoinHandle<()> {
        let engine = self.clone();
        self.inner
            .background
            .spawn(async move { engine.reload_pass(domain).await })
    }

    // --- Observers ---

    /// Register `observer` and send it a reset with the current range.
    ///
    /// The engine only keeps a weak reference. The initial reset is
    /// delivered on the background executor once no pass is running, so it
    /// always reflects a settled range.
    pub fn add_observer<O: RangeObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        let weak = Arc::downgrade(observer) as Weak<dyn RangeObserver>;
        let id = self.with_state(|s| s.observers.register(weak.clone()));
        debug!(%id, "observer registered");

        let engine = self.clone();
        self.inner.background.spawn(async move {
            let _pass = engine.inner.pass_gate.lock().await;
            let Some(observer) = weak.upgrade() else {
                return;
            };
            engine.pause();
            observer.on_reset(engine.rows());
            engine.resume();
        });
        id
    }

    /// Unregister an observer. Returns whether it was registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.with_state(|s| s.observers.unregister(id))
    }

    /// Number of registered observers still alive.
    pub fn observer_count(&self) -> usize {
        self.with_state(|s| s.observers.live_count())
    }

    // --- Internals ---

    /// Run `task` on the background executor and wait for it.
    ///
    /// Returns `None` when the executor shut down before the task finished.
    /// A panic inside the task resumes on the caller.
    async fn on_background<F>(&self, op: &'static str, task: F) -> Option<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match self.inner.background.spawn(task).await {
            Ok(output) => Some(output),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => {
                warn!(op, "background executor shut down, operation dropped");
                None
            }
        }
    }

    async fn load_initial_range(&self) {
        let (earliest, latest) = self.with_state(|s| (s.earliest, s.latest));
        let tracked = degrade(
            "initial range",
            self.inner
                .store
                .range_between(earliest, latest.exclusive_upper(), None)
                .await,
        );
        self.with_state(|s| s.tracked = tracked);
    }

    async fn tick_pass(&self) -> SyncOutcome {
        let depth = self.pause_depth();
        if depth > 0 {
            debug!(depth, "tick skipped: engine paused");
            return SyncOutcome::Paused;
        }
        self.sync_pass(None).await
    }

    async fn sync_pass(&self, on_done: Option<OnDone>) -> SyncOutcome {
        let Ok(_pass) = self.inner.pass_gate.try_lock() else {
            debug!("sync skipped: pass already in flight");
            self.complete_later(on_done);
            return SyncOutcome::InFlight;
        };

        let now = Instant::now().into_std();
        if !self.with_state(|s| s.throttle.try_acquire(now)) {
            debug!("sync skipped: inside rate-limit window");
            self.complete_later(on_done);
            return SyncOutcome::Throttled;
        }

        self.pause();
        self.run_pass().await;
        if let Some(done) = on_done {
            done();
        }
        self.resume();
        SyncOutcome::Performed
    }

    async fn bound_pass(&self, bound: Bound, value: Timestamp) {
        let _pass = self.inner.pass_gate.lock().await;
        self.pause();
        self.reconcile(bound, value).await;
        self.resume();
    }

    async fn filter_pass(&self, filter: Filter) -> Result<(), FilterError> {
        filter.validate()?;

        let _pass = self.inner.pass_gate.lock().await;
        self.pause();

        let now = self.inner.clock.now();
        let transition =
            self.with_state(|s| FilterTransition::new(s.earliest, s.latest, &filter, now));
        if transition.is_noop() {
            debug!("filter unchanged");
        } else {
            info!(
                earliest = %transition.to_earliest,
                latest = %transition.to_latest,
                kind = ?transition.kind,
                "applying filter change"
            );
        }

        for bound in transition.order() {
            let target = match bound {
                Bound::Earliest => transition.to_earliest,
                Bound::Latest => transition.to_latest,
            };
            self.reconcile(bound, target).await;
        }
        self.with_state(|s| s.kind = transition.kind);

        self.resume();
        Ok(())
    }

    async fn reload_pass(&self, domain: Option<String>) {
        let _pass = self.inner.pass_gate.lock().await;
        self.pause();

        let (earliest, latest) = self.with_state(|s| (s.earliest, s.latest));
        match self
            .inner
            .store
            .range_between(earliest, latest.exclusive_upper(), None)
            .await
        {
            Ok(fresh) => {
                self.with_state(|s| s.tracked = fresh);
                info!(tracked = ?fresh, domain = domain.as_deref(), "reloaded after external mutation");
                let event = match domain {
                    Some(domain) => RangeEvent::PartialRemove { domain },
                    None => RangeEvent::Reset { range: fresh },
                };
                self.publish(&event);
            }
            Err(e) => warn!(error = %e, "reload skipped: store query failed"),
        }

        self.resume();
    }

    async fn run_pass(&self) {
        let persisted = degrade(
            "persist_buffered",
            self.inner.store.persist_buffered().await,
        );

        let (kind, earliest, latest) = self.with_state(|s| (s.kind, s.earliest, s.latest));

        if let Some(persisted) = persisted {
            debug!(%persisted, "persisted buffered rows");
            let tracked = self.rows();
            let reconciled = match kind {
                FilterKind::AbsoluteRange => {
                    // New rows may fall outside a fixed window.
                    let visible = degrade(
                        "range_between",
                        self.inner
                            .store
                            .range_between(earliest, latest.exclusive_upper(), Some(persisted))
                            .await,
                    );
                    visible.map(|rows| extend_with_persisted(tracked, rows))
                }
                FilterKind::RollingWindow { .. } | FilterKind::Unbounded => {
                    Some(extend_with_persisted(tracked, persisted))
                }
            };
            if let Some(reconciled) = reconciled {
                self.commit(reconciled);
            }
        }

        if let FilterKind::RollingWindow { .. } = kind {
            let filter = Filter {
                kind,
                earliest,
                latest,
            };
            let window_start = filter.effective_earliest(self.inner.clock.now());
            self.reconcile(Bound::Earliest, window_start).await;
        }
    }

    async fn reconcile(&self, bound: Bound, value: Timestamp) {
        let (old, tracked) = self.with_state(|s| (s.bound(bound), s.tracked));
        let plan = match bound {
            Bound::Earliest => plan_earliest(old, value, tracked),
            Bound::Latest => plan_latest(old, value, tracked),
        };

        let found = match plan.query().copied() {
            Some(query) => degrade(
                "range_between",
                self.inner
                    .store
                    .range_between(query.from, query.to, query.within)
                    .await,
            ),
            None => None,
        };

        let reconciled = plan.apply(tracked, found);
        debug!(%bound, %old, new = %value, tracked = ?reconciled.tracked, "bound reconciled");
        self.with_state(|s| s.set_bound(bound, value));
        self.commit(reconciled);
    }

    fn commit(&self, reconciled: Reconciled) {
        self.with_state(|s| s.tracked = reconciled.tracked);
        if let Some(event) = reconciled.event {
            self.publish(&event);
        }
    }

    fn publish(&self, event: &RangeEvent) {
        let observers = self.with_state(|s| {
            s.pause.pause();
            s.observers.live()
        });
        debug!(%event, observers = observers.len(), "publishing range event");
        for observer in &observers {
            deliver(observer.as_ref(), event);
        }
        self.resume();
    }

    fn complete_later(&self, on_done: Option<OnDone>) {
        if let Some(done) = on_done {
            self.inner.background.spawn(async move { done() });
        }
    }

    fn watch_filters(&self, mut filters: watch::Receiver<Filter>) {
        let weak = Arc::downgrade(&self.inner);
        let task = self.inner.background.spawn(async move {
            while filters.changed().await.is_ok() {
                let filter = *filters.borrow_and_update();
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = (SyncEngine { inner }).filter_pass(filter).await {
                    warn!(error = %e, "ignoring invalid filter");
                }
            }
        });
        *lock(&self.inner.watcher) = Some(task);
    }

    fn spawn_ticker(&self) {
        let mut slot = lock(&self.inner.ticker);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let period = self.inner.config.sync.interval();
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(self.inner.background.spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                (SyncEngine { inner }).tick_pass().await;
            }
        }));
        info!(period_ms = period.as_millis() as u64, "periodic sync started");
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        let mut state = lock(&self.inner.state);
        f(&mut state)
    }
}

impl<S> fmt::Debug for SyncEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("SyncEngine")
            .field("tracked", &state.tracked)
            .field("earliest", &state.earliest)
            .field("latest", &state.latest)
            .field("kind", &state.kind)
            .field("pause_depth", &state.pause.depth())
            .field("observers", &state.observers)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store failures never reach observers: log and carry on as "no rows".
fn degrade(op: &'static str, result: Result<Option<RowRange>, StoreError>) -> Option<RowRange> {
    result.unwrap_or_else(|e| {
        warn!(op, error = %e, "store query failed, no event emitted");
        None
    })
}
