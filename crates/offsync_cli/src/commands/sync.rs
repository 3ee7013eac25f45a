//! Sync command implementation.

use super::open;
use offsync_sync_engine::{SimulatedFetcher, SimulatedFetcherConfig, SyncConfig, SyncOutcome};
use std::path::Path;
use tracing::info;

/// Runs the sync command.
///
/// A failed cycle is reported and returned as an error so the process exits
/// non-zero; a stale fallback is not an error.
pub async fn run(
    path: &Path,
    config: SyncConfig,
    remote: SimulatedFetcherConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Syncing cache at {:?}", path);
    let coordinator = open(path, config, SimulatedFetcher::new(remote))?;

    let outcome = coordinator.refresh().await;
    println!("{}", describe(&outcome));
    println!("{}", coordinator.sync_status());

    match outcome {
        SyncOutcome::Failure(err) => Err(err.into()),
        _ => Ok(()),
    }
}

/// One-line summary of a refresh outcome.
pub fn describe(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Success { records } => {
            format!("Synced {} users from remote", records.len())
        }
        SyncOutcome::SuccessWithStaleData { records, cause } => format!(
            "Offline ({}): showing {} cached users",
            cause.message,
            records.len()
        ),
        SyncOutcome::Failure(err) => format!("Sync failed: {}", err.reason()),
    }
}
