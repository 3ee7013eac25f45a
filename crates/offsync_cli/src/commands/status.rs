//! Status command implementation.

use super::{format_millis, open, NoRemote};
use offsync_storage::{LedgerStore, LocalStore, RecordStore, UserFilter};
use offsync_sync_engine::{RemoteFetcher, SyncConfig, SyncCoordinator};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Cache status report.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Snapshot path.
    pub path: String,
    /// Human-facing sync label.
    pub status: String,
    /// Last successful sync in epoch milliseconds.
    pub last_sync_time: Option<i64>,
    /// Whether the data is older than `stale_after_secs`.
    pub stale: bool,
    /// Staleness threshold in seconds.
    pub stale_after_secs: u64,
    /// Number of cached users.
    pub users: usize,
    /// Users present in the latest successful fetch.
    pub online_users: usize,
    /// Users backed by local storage.
    pub cached_users: usize,
    /// Number of ledger entries, expired ones included.
    pub ledger_entries: usize,
}

/// Runs the status command.
pub fn run(
    path: &Path,
    stale_after_secs: Option<u64>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = SyncConfig::default();
    if let Some(secs) = stale_after_secs {
        config = config.with_stale_after(Duration::from_secs(secs));
    }
    let coordinator = open(path, config, NoRemote)?;
    let report = collect(&coordinator, path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

/// Builds the status report for `coordinator`.
pub fn collect<F: RemoteFetcher>(
    coordinator: &SyncCoordinator<LocalStore, F>,
    path: &Path,
) -> Result<StatusReport, Box<dyn std::error::Error>> {
    let store = coordinator.store();
    Ok(StatusReport {
        path: path.display().to_string(),
        status: coordinator.sync_status().to_string(),
        last_sync_time: coordinator.last_sync_time().map(|at| at.as_millis()),
        stale: coordinator.is_stale(),
        stale_after_secs: coordinator.config().stale_after.as_secs(),
        users: store.user_count()?,
        online_users: store.users_matching(UserFilter::Online)?.len(),
        cached_users: store.users_matching(UserFilter::Cached)?.len(),
        ledger_entries: store.ledger_entries()?.len(),
    })
}

fn print_text_output(report: &StatusReport) {
    println!("Offsync Cache Status");
    println!("====================");
    println!();
    println!("Path: {}", report.path);
    println!();
    println!("Sync:");
    println!("  {}", report.status);
    match report.last_sync_time {
        Some(millis) => println!("  Last sync time: {}", format_millis(millis)),
        None => println!("  Last sync time: never"),
    }
    println!(
        "  Stale:          {} (after {}s)",
        if report.stale { "yes" } else { "no" },
        report.stale_after_secs
    );
    println!();
    println!("Users:");
    println!("  Total:  {}", report.users);
    println!("  Online: {}", report.online_users);
    println!("  Cached: {}", report.cached_users);
    println!();
    println!("Ledger entries: {}", report.ledger_entries);
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsync_sync_engine::{SimulatedFetcher, SimulatedFetcherConfig};

    #[tokio::test]
    async fn report_reflects_sync_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.cbor");

        let empty = collect(&open(&path, SyncConfig::default(), NoRemote).unwrap(), &path).unwrap();
        assert_eq!(empty.status, "No sync yet");
        assert!(empty.stale);
        assert_eq!(empty.users, 0);

        let fetcher = SimulatedFetcher::new(
            SimulatedFetcherConfig::new()
                .with_latency(Duration::ZERO)
                .with_failure_rate(0.0),
        );
        let coordinator = open(&path, SyncConfig::default(), fetcher).unwrap();
        assert!(coordinator.refresh().await.is_success());

        let synced = collect(&coordinator, &path).unwrap();
        assert_eq!(synced.status, "Last sync: Just now");
        assert!(!synced.stale);
        assert!(synced.last_sync_time.is_some());
        assert_eq!(synced.online_users, 12);
        assert_eq!(synced.cached_users, 12);
        assert_eq!(synced.ledger_entries, 1);

        let json = serde_json::to_value(&synced).unwrap();
        assert_eq!(json["users"], 12);

        coordinator.clear_cache().await.unwrap();
        let cleared = collect(&coordinator, &path).unwrap();
        assert_eq!(cleared.users, 0);
        assert_eq!(cleared.ledger_entries, 0);
        assert!(cleared.last_sync_time.is_none());
    }
}
