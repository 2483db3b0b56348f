//! # logview
//!
//! CLI driver for the logview sync engine.
//!
//! ## Commands
//!
//! - `simulate`: Feed synthetic DNS traffic through an engine and print the
//!   deltas it emits
//! - `config`: Show the effective engine configuration
//!
//! ## Example
//!
//! ```bash
//! # Three batches of 20 queries, then narrow to the last minute
//! logview simulate --batches 3 --batch-size 20 --window-minutes 1
//!
//! # Purge a domain after the batches and watch the partial remove
//! logview -v simulate --purge ads.example.net
//!
//! # Where is the configuration coming from?
//! logview config
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::simulate::SimulateOptions;

/// CLI driver for the logview sync engine.
#[derive(Parser, Debug)]
#[command(name = "logview")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (default: engine.toml in the config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Feed synthetic query traffic through a sync engine
    Simulate {
        /// Number of batches to persist
        #[arg(long, default_value = "3")]
        batches: u32,

        /// Queries per batch
        #[arg(long, default_value = "20")]
        batch_size: u32,

        /// Switch to a rolling window of this many minutes afterwards
        #[arg(long)]
        window_minutes: Option<u32>,

        /// Purge this domain afterwards and reload
        #[arg(long)]
        purge: Option<String>,

        /// Seed for the traffic generator
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the effective engine configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (engine_config, source) = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            batches,
            batch_size,
            window_minutes,
            purge,
            seed,
        } => {
            let options = SimulateOptions {
                batches,
                batch_size,
                window_minutes,
                purge,
                seed,
            };
            commands::simulate::run(engine_config, &options).await?;
        }
        Commands::Config => {
            commands::config::run(&engine_config, source.as_deref());
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    // RUST_LOG wins over -v.
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
