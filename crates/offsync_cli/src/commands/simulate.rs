//! Simulate command implementation.

use super::{open, sync::describe};
use offsync_sync_engine::{SimulatedFetcher, SimulatedFetcherConfig, SyncConfig};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Runs the simulate command.
pub async fn run(
    path: &Path,
    cycles: u32,
    interval_ms: u64,
    remote: SimulatedFetcherConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Simulating {} sync cycles against {:?}", cycles, path);
    let coordinator = open(path, SyncConfig::default(), SimulatedFetcher::new(remote))?;

    for cycle in 1..=cycles {
        let outcome = coordinator.refresh().await;
        println!("[{cycle}/{cycles}] {}", describe(&outcome));

        if cycle < cycles && interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }

    let stats = coordinator.stats();
    println!();
    println!("Cycles:          {}", stats.cycles_attempted);
    println!("  Successful:    {}", stats.cycles_successful);
    println!("  Stale:         {}", stats.stale_fallbacks);
    println!("  Failed:        {}", stats.failures);
    println!("Records fetched: {}", stats.records_fetched);
    println!("{}", coordinator.sync_status());

    Ok(())
}
