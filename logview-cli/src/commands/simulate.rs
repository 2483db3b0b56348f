//! Feed synthetic query traffic through a sync engine.

use anyhow::{Context, Result};
use logview_engine::{
    Bound, Clock, EngineConfig, Filter, MemoryStore, RangeObserver, RowRange, RowStore,
    SyncEngine, SyncOutcome, SystemClock,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// Domains the traffic generator picks from.
const DOMAINS: &[&str] = &[
    "example.com",
    "ads.example.net",
    "api.github.com",
    "cdn.jsdelivr.net",
    "telemetry.example.org",
    "news.ycombinator.com",
];

/// How many rows to print at the end.
const ROWS_SHOWN: usize = 10;

/// Options for the simulate command.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// Number of batches to persist.
    pub batches: u32,
    /// Queries per batch.
    pub batch_size: u32,
    /// Rolling window to switch to after the batches.
    pub window_minutes: Option<u32>,
    /// Domain to purge after the batches.
    pub purge: Option<String>,
    /// Traffic generator seed.
    pub seed: Option<u64>,
}

/// What a simulation ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Final visible range.
    pub tracked: Option<RowRange>,
    /// Deltas delivered to the observer, initial reset included.
    pub events: usize,
}

/// Observer that logs every delta.
#[derive(Debug, Default)]
struct LoggingObserver {
    events: AtomicUsize,
}

impl LoggingObserver {
    fn count(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }
}

impl RangeObserver for LoggingObserver {
    fn on_reset(&self, range: Option<RowRange>) {
        self.bump();
        match range {
            Some(range) => info!(%range, "reset"),
            None => info!("reset: nothing visible"),
        }
    }

    fn on_insert(&self, range: RowRange, affects: Option<Bound>) {
        self.bump();
        info!(%range, rows = range.len(), affects = ?affects, "insert");
    }

    fn on_remove(&self, range: RowRange, affects: Bound) {
        self.bump();
        info!(%range, rows = range.len(), %affects, "remove");
    }

    fn on_partial_remove(&self, domain: &str) {
        self.bump();
        info!(domain, "partial remove");
    }
}

/// Run the simulate command.
pub async fn run(config: EngineConfig, options: &SimulateOptions) -> Result<Summary> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let pace = config.sync.min_spacing();

    let store = MemoryStore::new();
    let engine = SyncEngine::builder(store.clone())
        .config(config)
        .autostart(false)
        .spawn()
        .await;
    let observer = Arc::new(LoggingObserver::default());
    engine.add_observer(&observer);

    // One query per second, the last one landing now.
    let now = SystemClock.now();
    let total = i64::from(options.batches) * i64::from(options.batch_size);
    let mut timestamp = now.offset(1 - total);

    println!(
        "Simulating {} batches of {} queries...",
        options.batches, options.batch_size
    );
    for batch in 1..=options.batches {
        for _ in 0..options.batch_size {
            let domain = DOMAINS[rng.gen_range(0..DOMAINS.len())];
            let client = format!("192.168.1.{}", rng.gen_range(2..=254));
            store.buffer_entry(timestamp, domain, &client, rng.gen_bool(0.1));
            timestamp = timestamp.offset(1);
        }

        while engine.sync_now(None).await != SyncOutcome::Performed {
            tokio::time::sleep(pace).await;
        }
        println!("  batch {batch}: visible {}", describe(engine.rows()));
    }

    if let Some(minutes) = options.window_minutes {
        let filter = Filter::rolling(minutes, SystemClock.now())?;
        engine
            .apply_filter(filter)
            .await
            .context("Failed to apply rolling window")?;
        println!(
            "Rolling window of {minutes} min: visible {}",
            describe(engine.rows())
        );
    }

    if let Some(domain) = options.purge.as_deref() {
        let purged = store.purge_domain(domain);
        engine.needs_reload(Some(domain)).await;
        println!(
            "Purged {purged} rows for {domain}: visible {}",
            describe(engine.rows())
        );
    }

    let tracked = engine.rows();
    print_rows(&store, tracked).await?;
    engine.stop();

    let summary = Summary {
        tracked,
        events: observer.count(),
    };
    println!("Observer received {} deltas.", summary.events);
    Ok(summary)
}

async fn print_rows(store: &MemoryStore, tracked: Option<RowRange>) -> Result<()> {
    let Some(range) = tracked else {
        println!();
        println!("No rows visible.");
        return Ok(());
    };

    let rows = store
        .rows_for_domain(None, range)
        .await
        .context("Failed to read visible rows")?;
    println!();
    println!("Visible rows ({} total):", rows.len());
    for entry in rows.iter().rev().take(ROWS_SHOWN) {
        println!(
            "  #{:<6} {:>12}  {:<15} {}{}",
            entry.row_id,
            entry.timestamp,
            entry.client,
            entry.domain,
            if entry.blocked { "  [blocked]" } else { "" }
        );
    }
    if rows.len() > ROWS_SHOWN {
        println!("  ... {} more", rows.len() - ROWS_SHOWN);
    }
    Ok(())
}

fn describe(range: Option<RowRange>) -> String {
    match range {
        Some(range) => format!("{range} ({} rows)", range.len()),
        None => "nothing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logview_engine::SyncConfig;

    fn fast() -> EngineConfig {
        EngineConfig {
            sync: SyncConfig {
                interval_ms: 60_000,
                min_spacing_ms: 0,
            },
        }
    }

    fn options(batches: u32, batch_size: u32) -> SimulateOptions {
        SimulateOptions {
            batches,
            batch_size,
            window_minutes: None,
            purge: None,
            seed: Some(7),
        }
    }

    #[tokio::test]
    async fn batches_end_up_visible() {
        let summary = run(fast(), &options(3, 4)).await.unwrap();
        assert_eq!(summary.tracked, RowRange::new(1, 12));
    }

    #[tokio::test]
    async fn no_batches_shows_nothing() {
        let summary = run(fast(), &options(0, 10)).await.unwrap();
        assert_eq!(summary.tracked, None);
    }

    #[tokio::test]
    async fn narrow_window_drops_old_rows() {
        let mut opts = options(2, 60);
        opts.window_minutes = Some(1);

        let summary = run(fast(), &opts).await.unwrap();
        let tracked = summary.tracked.unwrap();
        assert_eq!(tracked.end(), 120);
        assert!(tracked.start() > 1);
    }

    #[tokio::test]
    async fn purge_keeps_the_run_going() {
        let mut opts = options(2, 30);
        opts.purge = Some("example.com".to_string());

        let summary = run(fast(), &opts).await.unwrap();
        assert!(summary.tracked.is_some());
    }

    #[tokio::test]
    async fn purge_adds_one_partial_remove() {
        let plain = run(fast(), &options(2, 30)).await.unwrap();

        let mut opts = options(2, 30);
        opts.purge = Some("example.com".to_string());
        let purged = run(fast(), &opts).await.unwrap();

        // Reset plus one insert per batch.
        assert_eq!(plain.events, 3);
        assert_eq!(purged.events, plain.events + 1);
    }

    #[test]
    fn describe_counts_rows() {
        assert_eq!(describe(RowRange::new(3, 5)), "[3,5] (3 rows)");
        assert_eq!(describe(None), "nothing");
    }
}
