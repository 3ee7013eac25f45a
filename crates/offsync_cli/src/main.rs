//! Offsync CLI
//!
//! Command-line driver for the offline-first sync layer.
//!
//! # Commands
//!
//! - `sync` - Run one refresh cycle against the simulated remote
//! - `simulate` - Run repeated refresh cycles
//! - `clear` - Delete every cached user and ledger entry
//! - `status` - Show last sync time, staleness and cache counts
//! - `list` - List cached users
//! - `sweep` - Delete expired ledger entries

mod commands;

use clap::{Args, Parser, Subcommand};
use offsync_sync_engine::SyncConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Offsync command-line tools.
#[derive(Parser)]
#[command(name = "offsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the cache snapshot file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Simulated remote settings.
#[derive(Args, Debug, Clone)]
struct RemoteArgs {
    /// Probability that a fetch fails, between 0 and 1
    #[arg(long, default_value = "0.3")]
    failure_rate: f64,

    /// Simulated network latency in milliseconds
    #[arg(long, default_value = "1000")]
    latency_ms: u64,

    /// Seed for reproducible failures
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one refresh cycle
    Sync {
        /// Expire the last-sync record this many seconds after the sync
        #[arg(long)]
        ledger_ttl_secs: Option<u64>,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Run repeated refresh cycles
    Simulate {
        /// Number of cycles to run
        #[arg(short, long, default_value = "5")]
        cycles: u32,

        /// Pause between cycles in milliseconds
        #[arg(short, long, default_value = "0")]
        interval_ms: u64,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Delete every cached user and ledger entry
    Clear,

    /// Show sync status and cache counts
    Status {
        /// Age in seconds after which data counts as stale
        #[arg(short, long)]
        stale_after_secs: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List cached users
    List {
        /// Which users to list (all, online, cached)
        #[arg(long, default_value = "all", value_parser = ["all", "online", "cached"])]
        filter: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete expired ledger entries
    Sweep,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Sync {
            ledger_ttl_secs,
            remote,
        } => {
            let path = cli.path.ok_or("Snapshot path required for sync")?;
            let config =
                SyncConfig::new().with_ledger_ttl(ledger_ttl_secs.map(Duration::from_secs));
            commands::sync::run(&path, config, remote.into()).await?;
        }
        Commands::Simulate {
            cycles,
            interval_ms,
            remote,
        } => {
            let path = cli.path.ok_or("Snapshot path required for simulate")?;
            commands::simulate::run(&path, cycles, interval_ms, remote.into()).await?;
        }
        Commands::Clear => {
            let path = cli.path.ok_or("Snapshot path required for clear")?;
            commands::clear::run(&path).await?;
        }
        Commands::Status {
            stale_after_secs,
            format,
        } => {
            let path = cli.path.ok_or("Snapshot path required for status")?;
            commands::status::run(&path, stale_after_secs, &format)?;
        }
        Commands::List { filter, format } => {
            let path = cli.path.ok_or("Snapshot path required for list")?;
            commands::list::run(&path, &filter, &format)?;
        }
        Commands::Sweep => {
            let path = cli.path.ok_or("Snapshot path required for sweep")?;
            commands::sweep::run(&path).await?;
        }
        Commands::Version => {
            println!("Offsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Offsync Sync Engine v{}", offsync_sync_engine::VERSION);
        }
    }

    Ok(())
}

impl From<RemoteArgs> for offsync_sync_engine::SimulatedFetcherConfig {
    fn from(args: RemoteArgs) -> Self {
        Self::new()
            .with_failure_rate(args.failure_rate)
            .with_latency(Duration::from_millis(args.latency_ms))
            .with_seed(args.seed)
    }
}
