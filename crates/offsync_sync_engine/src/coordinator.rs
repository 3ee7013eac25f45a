//! The sync coordinator.

use crate::config::SyncConfig;
use crate::error::{FetchError, SyncError, SyncResult};
use crate::fetcher::RemoteFetcher;
use crate::outcome::{ClearReport, SyncOutcome};
use crate::status::{SyncState, SyncStats, SyncStatus};
use offsync_storage::{
    CacheLedger, Clock, LedgerEntry, SyncStore, SystemClock, Timestamp, UserFilter, UserId,
    UserRecord, UserWatch,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Orchestrates refresh cycles between a remote fetcher and a local store.
///
/// Each refresh reads the local snapshot, calls the fetcher and then either
/// reconciles the fetched batch in one store transaction or falls back to
/// the records already held locally. Records missing from a fetched batch
/// are demoted to offline, never deleted; only [`SyncCoordinator::clear_cache`]
/// removes records.
///
/// # Concurrency
///
/// `refresh`, `clear_cache` and `sweep_ledger` hold an async cycle lock, so
/// they run one at a time in call order. Reads never take that lock and
/// observe the store either before or after a cycle's transaction.
///
/// # Example
///
/// ```rust
/// use offsync_storage::{LocalStore, SystemClock, UserId, UserRecord};
/// use offsync_sync_engine::{ScriptedFetcher, SyncConfig, SyncCoordinator};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = ScriptedFetcher::returning(vec![
///     UserRecord::new(UserId::new(1), "Ada", "ada@example.com"),
/// ]);
/// let coordinator = SyncCoordinator::new(
///     SyncConfig::default(),
///     Arc::new(LocalStore::in_memory()),
///     fetcher,
///     SystemClock,
/// );
///
/// let outcome = coordinator.refresh().await;
/// assert!(outcome.is_success());
/// assert!(!coordinator.is_stale());
/// # }
/// ```
pub struct SyncCoordinator<S, F, C = SystemClock> {
    config: SyncConfig,
    store: Arc<S>,
    fetcher: F,
    ledger: CacheLedger<S, C>,
    cycle: Mutex<()>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<S: SyncStore, F: RemoteFetcher, C: Clock> SyncCoordinator<S, F, C> {
    /// Creates a coordinator over `store` and `fetcher`.
    pub fn new(config: SyncConfig, store: Arc<S>, fetcher: F, clock: C) -> Self {
        let ledger = CacheLedger::new(Arc::clone(&store), clock);
        Self {
            config,
            store,
            fetcher,
            ledger,
            cycle: Mutex::new(()),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the remote fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Returns the clock.
    pub fn clock(&self) -> &C {
        self.ledger.clock()
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    fn now(&self) -> Timestamp {
        self.ledger.clock().now()
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Runs one refresh cycle.
    ///
    /// Never returns an error: fetch failures become a stale fallback or an
    /// empty-cache failure, and storage failures are reported through
    /// [`SyncOutcome::Failure`]. If the returned future is dropped before it
    /// completes, the store is left exactly as it was.
    pub async fn refresh(&self) -> SyncOutcome {
        let _cycle = self.cycle.lock().await;
        let mut phase = PhaseGuard::enter(&self.state, SyncState::Reconciling);
        self.stats.write().cycles_attempted += 1;

        let snapshot = match self.store.all_users() {
            Ok(records) => records,
            Err(err) => {
                let outcome = SyncOutcome::Failure(SyncError::StorageRead(err));
                self.settle(&mut phase, &outcome, 0);
                return outcome;
            }
        };
        debug!(local_users = snapshot.len(), "refresh started");

        self.set_state(SyncState::Fetching);
        let fetched = self.fetcher.fetch().await;
        self.set_state(SyncState::Reconciling);

        let (outcome, fetched_count) = match fetched {
            Ok(batch) => {
                let count = batch.len();
                let outcome = match self.reconcile(batch) {
                    Ok(records) => SyncOutcome::Success { records },
                    Err(err) => SyncOutcome::Failure(err),
                };
                (outcome, count)
            }
            Err(cause) => (self.fallback(cause), 0),
        };

        self.settle(&mut phase, &outcome, fetched_count);
        outcome
    }

    /// Writes a fetched batch: demote everything, upsert the batch and stamp
    /// the ledger, all in one transaction.
    fn reconcile(&self, batch: Vec<UserRecord>) -> SyncResult<Vec<UserRecord>> {
        let now = self.now();
        let records: Vec<UserRecord> = batch.into_iter().map(|user| user.fresh(now)).collect();
        let entry = LedgerEntry::new(self.config.last_sync_key.as_str(), now.to_string(), now)
            .with_expiry(self.config.ledger_ttl.map(|ttl| now.saturating_add(ttl)));

        let demoted = self
            .store
            .write(|txn| {
                let demoted = txn.mark_all_offline();
                txn.upsert_users(&records)?;
                txn.put_ledger_entry(entry)?;
                Ok(demoted)
            })
            .map_err(SyncError::StorageWrite)?;

        debug!(fetched = records.len(), demoted, now = %now, "reconciled remote batch");
        Ok(records)
    }

    fn fallback(&self, cause: FetchError) -> SyncOutcome {
        match self.store.all_users() {
            Ok(records) if records.is_empty() => SyncOutcome::Failure(SyncError::EmptyCache { cause }),
            Ok(records) => SyncOutcome::SuccessWithStaleData { records, cause },
            Err(err) => SyncOutcome::Failure(SyncError::StorageRead(err)),
        }
    }

    fn settle(&self, phase: &mut PhaseGuard<'_>, outcome: &SyncOutcome, fetched: usize) {
        let now = self.now();
        let state = match outcome {
            SyncOutcome::Success { .. } => SyncState::Synced,
            SyncOutcome::SuccessWithStaleData { .. } => SyncState::Offline,
            SyncOutcome::Failure(_) => SyncState::Error,
        };
        phase.settle(state);

        let mut stats = self.stats.write();
        stats.records_fetched += fetched as u64;
        stats.last_outcome_at = Some(now);
        match outcome {
            SyncOutcome::Success { records } => {
                stats.cycles_successful += 1;
                stats.last_error = None;
                info!(users = records.len(), "sync succeeded");
            }
            SyncOutcome::SuccessWithStaleData { records, cause } => {
                stats.stale_fallbacks += 1;
                stats.last_error = Some(cause.to_string());
                warn!(users = records.len(), error = %cause, "remote unavailable, serving cached users");
            }
            SyncOutcome::Failure(err) => {
                stats.failures += 1;
                stats.last_error = Some(err.to_string());
                warn!(reason = %err.reason(), error = %err, "sync failed");
            }
        }
    }

    /// Deletes every user and every ledger entry in one transaction.
    ///
    /// Waits for any in-flight refresh to finish first.
    pub async fn clear_cache(&self) -> SyncResult<ClearReport> {
        let _cycle = self.cycle.lock().await;
        let report = self
            .store
            .write(|txn| {
                Ok(ClearReport {
                    users_removed: txn.clear_users(),
                    ledger_entries_removed: txn.clear_ledger(),
                })
            })
            .map_err(SyncError::StorageWrite)?;

        self.set_state(SyncState::Idle);
        info!(
            users_removed = report.users_removed,
            ledger_entries_removed = report.ledger_entries_removed,
            "cache cleared"
        );
        Ok(report)
    }

    /// Deletes ledger entries that expired before now.
    pub async fn sweep_ledger(&self) -> SyncResult<usize> {
        let _cycle = self.cycle.lock().await;
        self.ledger
            .sweep_expired(self.now())
            .map_err(SyncError::StorageWrite)
    }

    /// Returns when the last successful sync happened.
    ///
    /// Absent if there was none or the record could not be read. With a
    /// configured `ledger_ttl` it is also absent once the record expires.
    pub fn last_sync_time(&self) -> Option<Timestamp> {
        let key = self.config.last_sync_key.as_str();
        match self.ledger.get(key) {
            Ok(Some(entry)) => {
                let parsed = Timestamp::parse_millis(&entry.payload);
                if parsed.is_none() {
                    warn!(key, payload = %entry.payload, "unparsable last sync time");
                }
                parsed
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "failed to read last sync time");
                None
            }
        }
    }

    /// Returns true if the last sync is missing or at least `threshold` old.
    pub fn is_data_stale(&self, threshold: Duration) -> bool {
        match self.last_sync_time() {
            Some(last) => self.now().duration_since(last) >= threshold,
            None => true,
        }
    }

    /// Returns true if the data is older than the configured threshold.
    pub fn is_stale(&self) -> bool {
        self.is_data_stale(self.config.stale_after)
    }

    /// Returns the freshness label for the last sync.
    pub fn sync_status(&self) -> SyncStatus {
        SyncStatus::from_last_sync(self.last_sync_time(), self.now())
    }

    /// Lists every local user in listing order.
    pub fn users(&self) -> SyncResult<Vec<UserRecord>> {
        self.store.all_users().map_err(SyncError::StorageRead)
    }

    /// Lists local users passing `filter`.
    pub fn users_matching(&self, filter: UserFilter) -> SyncResult<Vec<UserRecord>> {
        self.store
            .users_matching(filter)
            .map_err(SyncError::StorageRead)
    }

    /// Looks up one local user.
    pub fn user(&self, id: UserId) -> SyncResult<Option<UserRecord>> {
        self.store.user(id).map_err(SyncError::StorageRead)
    }

    /// Counts local users.
    pub fn user_count(&self) -> SyncResult<usize> {
        self.store.user_count().map_err(SyncError::StorageRead)
    }

    /// Subscribes to local user snapshots passing `filter`.
    pub fn watch_users(&self, filter: UserFilter) -> SyncResult<UserWatch> {
        self.store
            .watch_users(filter)
            .map_err(SyncError::StorageRead)
    }
}

/// Restores the prior state if a refresh is abandoned mid-cycle.
struct PhaseGuard<'a> {
    state: &'a RwLock<SyncState>,
    previous: SyncState,
    settled: bool,
}

impl<'a> PhaseGuard<'a> {
    fn enter(state: &'a RwLock<SyncState>, phase: SyncState) -> Self {
        let previous = std::mem::replace(&mut *state.write(), phase);
        Self {
            state,
            previous,
            settled: false,
        }
    }

    fn settle(&mut self, state: SyncState) {
        *self.state.write() = state;
        self.settled = true;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            *self.state.write() = self.previous;
        }
    }
}
