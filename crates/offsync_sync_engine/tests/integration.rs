//! Integration tests for the sync coordinator against real stores.

use offsync_storage::{
    LedgerStore, LocalStore, ManualClock, RecordStore, SyncStore, Timestamp, UserFilter, UserId,
};
use offsync_sync_engine::{
    FailureReason, FetchError, RemoteFetcher, ScriptedFetcher, SimulatedFetcher,
    SimulatedFetcherConfig, SyncConfig, SyncCoordinator, SyncError, SyncOutcome, SyncState,
    LAST_SYNC_KEY,
};
use offsync_testkit::{
    cached_user, ids, remote_batch_strategy, sample_users, stored_table_strategy, user,
    FaultyStore, TestStore,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const START: Timestamp = Timestamp::from_millis(1_700_000_000_000);

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(START))
}

fn coordinator<S, F>(store: Arc<S>, fetcher: F) -> SyncCoordinator<S, F, Arc<ManualClock>>
where
    S: SyncStore,
    F: RemoteFetcher,
{
    SyncCoordinator::new(SyncConfig::default(), store, fetcher, clock())
}

fn flags(store: &LocalStore, id: u64) -> (bool, bool) {
    let record = store
        .user(UserId::new(id))
        .unwrap()
        .unwrap_or_else(|| panic!("user {id} missing"));
    (record.is_online, record.is_cached)
}

#[tokio::test]
async fn successful_refresh_demotes_records_missing_from_batch() {
    let store = Arc::new(LocalStore::in_memory());
    store
        .upsert_users(&[
            cached_user(1, "Ada", Timestamp::EPOCH),
            user(2, "Bob").fresh(Timestamp::EPOCH),
            user(3, "Cy").fresh(Timestamp::EPOCH),
        ])
        .unwrap();

    let coordinator = coordinator(
        Arc::clone(&store),
        ScriptedFetcher::returning(vec![user(2, "Bob"), user(4, "Dee")]),
    );
    let outcome = coordinator.refresh().await;

    let SyncOutcome::Success { records } = outcome else {
        panic!("expected success");
    };
    assert_eq!(ids(&records), vec![2, 4]);
    assert!(records.iter().all(|r| r.is_online && r.is_cached));
    assert!(records.iter().all(|r| r.last_sync_time == Some(START)));

    assert_eq!(flags(&store, 1), (false, true));
    assert_eq!(flags(&store, 2), (true, true));
    assert_eq!(flags(&store, 3), (false, true));
    assert_eq!(flags(&store, 4), (true, true));
    assert_eq!(store.user_count().unwrap(), 4);

    let online = store.users_matching(UserFilter::Online).unwrap();
    assert_eq!(ids(&online), vec![2, 4]);
}

#[tokio::test]
async fn demoted_records_keep_their_last_sync_time() {
    let store = Arc::new(LocalStore::in_memory());
    let earlier = Timestamp::from_millis(42);
    store.upsert_users(&[user(1, "Ada").fresh(earlier)]).unwrap();

    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::returning(vec![]));
    assert!(coordinator.refresh().await.is_success());

    let record = store.user(UserId::new(1)).unwrap().unwrap();
    assert!(!record.is_online);
    assert_eq!(record.last_sync_time, Some(earlier));
    assert_eq!(coordinator.last_sync_time(), Some(START));
}

#[tokio::test]
async fn clear_cache_removes_users_and_ledger() {
    let store = Arc::new(LocalStore::in_memory());
    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::returning(sample_users()));
    coordinator.refresh().await;
    assert!(coordinator.last_sync_time().is_some());

    let report = coordinator.clear_cache().await.unwrap();
    assert_eq!(report.users_removed, 5);
    assert_eq!(report.ledger_entries_removed, 1);

    assert!(coordinator.last_sync_time().is_none());
    assert!(coordinator.users().unwrap().is_empty());
    assert!(store.ledger_entries().unwrap().is_empty());
    assert_eq!(coordinator.state(), SyncState::Idle);
}

#[tokio::test]
async fn staleness_follows_sync_and_clear() {
    let coordinator = coordinator(
        Arc::new(LocalStore::in_memory()),
        ScriptedFetcher::returning(sample_users()),
    );
    assert!(coordinator.is_data_stale(Duration::from_secs(3600)));

    coordinator.refresh().await;
    assert!(!coordinator.is_data_stale(Duration::from_millis(1)));
    assert!(coordinator.is_data_stale(Duration::ZERO));

    coordinator.clock().advance(Duration::from_secs(120));
    assert!(coordinator.is_stale());
    assert!(!coordinator.is_data_stale(Duration::from_secs(121)));

    coordinator.clear_cache().await.unwrap();
    assert!(coordinator.is_data_stale(Duration::from_secs(3600)));
}

#[tokio::test]
async fn repeated_refresh_with_same_batch_is_idempotent() {
    let store = Arc::new(LocalStore::in_memory());
    store.upsert_users(&[cached_user(9, "Zed", Timestamp::EPOCH)]).unwrap();
    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::returning(sample_users()));

    coordinator.refresh().await;
    let first = store.all_users().unwrap();
    let first_ledger = store.ledger_entries().unwrap();

    coordinator.refresh().await;
    assert_eq!(store.all_users().unwrap(), first);
    assert_eq!(store.ledger_entries().unwrap(), first_ledger);
}

#[tokio::test]
async fn fetch_failure_serves_unchanged_local_snapshot() {
    let store = Arc::new(LocalStore::in_memory());
    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::returning(sample_users()));
    coordinator.refresh().await;

    let before = store.all_users().unwrap();
    let ledger_before = store.ledger_entries().unwrap();
    let commits_before = store.commit_count();

    coordinator
        .fetcher()
        .set_fallback(Err(FetchError::new("Network connection failed")));
    let outcome = coordinator.refresh().await;

    let SyncOutcome::SuccessWithStaleData { records, cause } = outcome else {
        panic!("expected stale data");
    };
    assert_eq!(records, before);
    assert_eq!(cause.message, "Network connection failed");
    assert_eq!(store.all_users().unwrap(), before);
    assert_eq!(store.ledger_entries().unwrap(), ledger_before);
    assert_eq!(store.commit_count(), commits_before);
    assert_eq!(coordinator.state(), SyncState::Offline);
}

#[tokio::test]
async fn fetch_failure_with_empty_cache_fails() {
    let store = Arc::new(LocalStore::in_memory());
    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::failing("unreachable"));

    let outcome = coordinator.refresh().await;
    assert_eq!(
        outcome.failure_reason(),
        Some(FailureReason::NoConnectivityEmptyCache)
    );
    let err = outcome.error().unwrap();
    assert_eq!(err.to_string(), "no connectivity and empty cache");
    assert!(err.is_retryable());
    assert!(matches!(err, SyncError::EmptyCache { cause } if cause.message == "unreachable"));

    assert_eq!(store.commit_count(), 0);
    assert!(coordinator.last_sync_time().is_none());
}

#[tokio::test]
async fn refetched_record_is_renamed_and_online() {
    let store = Arc::new(LocalStore::in_memory());
    store.upsert_users(&[cached_user(1, "A", Timestamp::EPOCH)]).unwrap();
    let coordinator = coordinator(
        Arc::clone(&store),
        ScriptedFetcher::returning(vec![user(1, "A'")]),
    );

    assert!(coordinator.refresh().await.is_success());
    let record = coordinator.user(UserId::new(1)).unwrap().unwrap();
    assert_eq!(record.name, "A'");
    assert!(record.is_online);
    assert!(record.is_cached);
    assert_eq!(coordinator.user_count().unwrap(), 1);
}

#[tokio::test]
async fn clear_waits_for_in_flight_refresh() {
    let store = Arc::new(LocalStore::in_memory());
    store.upsert_users(&[cached_user(9, "Zed", Timestamp::EPOCH)]).unwrap();
    let fetcher = ScriptedFetcher::returning(sample_users()).gated();
    let coordinator = Arc::new(coordinator(Arc::clone(&store), fetcher));
    let mut watch = coordinator.watch_users(UserFilter::All).unwrap();
    assert_eq!(watch.next().await.map(|s| s.len()), Some(1));

    let refresh = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.refresh().await })
    };
    coordinator.fetcher().wait_until_fetching().await;
    assert_eq!(coordinator.state(), SyncState::Fetching);

    let clear = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.clear_cache().await })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!clear.is_finished());
    assert_eq!(store.user_count().unwrap(), 1);

    coordinator.fetcher().release(1);
    assert!(refresh.await.unwrap().is_success());
    let report = clear.await.unwrap().unwrap();
    assert_eq!(report.users_removed, 6);

    let after_refresh = watch.next().await.unwrap();
    assert_eq!(after_refresh.len(), 6);
    assert!(after_refresh
        .iter()
        .all(|r| r.is_cached && (r.is_online == (r.id != UserId::new(9)))));
    assert!(watch.next().await.unwrap().is_empty());
    assert!(watch.try_next().is_none());

    assert!(coordinator.last_sync_time().is_none());
}

#[tokio::test]
async fn concurrent_refreshes_are_serialized() {
    let fetcher = ScriptedFetcher::returning(sample_users()).gated();
    let coordinator = Arc::new(coordinator(Arc::new(LocalStore::in_memory()), fetcher));

    let spawn_refresh = || {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.refresh().await })
    };
    let first = spawn_refresh();
    let second = spawn_refresh();

    coordinator.fetcher().wait_until_fetching().await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(coordinator.fetcher().calls(), 1);

    coordinator.fetcher().release(2);
    assert!(first.await.unwrap().is_success());
    assert!(second.await.unwrap().is_success());
    assert_eq!(coordinator.fetcher().calls(), 2);
    assert_eq!(coordinator.stats().cycles_successful, 2);
}

#[tokio::test]
async fn unreadable_store_fails_before_fetching() {
    let store = Arc::new(FaultyStore::in_memory());
    store.fail_reads(true);
    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::returning(sample_users()));

    let outcome = coordinator.refresh().await;
    assert_eq!(outcome.failure_reason(), Some(FailureReason::StorageRead));
    assert_eq!(
        outcome.failure_reason().unwrap().to_string(),
        "storage read failure"
    );
    assert_eq!(coordinator.fetcher().calls(), 0);
    assert!(!outcome.error().unwrap().is_retryable());
}

#[tokio::test]
async fn unreadable_fallback_reports_read_failure() {
    let store = Arc::new(FaultyStore::in_memory());
    store.upsert_users(&sample_users()).unwrap();
    store.fail_reads_after(1);
    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::failing("offline"));

    let outcome = coordinator.refresh().await;
    assert_eq!(outcome.failure_reason(), Some(FailureReason::StorageRead));
    assert_eq!(coordinator.fetcher().calls(), 1);
    assert_eq!(coordinator.state(), SyncState::Error);
}

#[tokio::test]
async fn failed_write_leaves_store_untouched() {
    let store = Arc::new(FaultyStore::in_memory());
    store.upsert_users(&[cached_user(1, "Ada", Timestamp::EPOCH)]).unwrap();
    store.fail_writes(true);
    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::returning(sample_users()));

    let outcome = coordinator.refresh().await;
    assert_eq!(outcome.failure_reason(), Some(FailureReason::StorageWrite));
    assert_eq!(store.user_count().unwrap(), 1);
    assert_eq!(store.inner().commit_count(), 1);
    assert!(coordinator.last_sync_time().is_none());

    let err = coordinator.clear_cache().await.unwrap_err();
    assert!(matches!(err, SyncError::StorageWrite(_)));
    assert_eq!(store.user_count().unwrap(), 1);
}

#[tokio::test]
async fn ledger_read_failure_reads_as_never_synced() {
    let store = Arc::new(FaultyStore::in_memory());
    let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::returning(sample_users()));
    coordinator.refresh().await;
    assert!(coordinator.last_sync_time().is_some());

    store.fail_reads(true);
    assert!(coordinator.last_sync_time().is_none());
    assert!(coordinator.is_stale());
    assert!(coordinator.users().is_err());
}

#[tokio::test]
async fn durable_store_keeps_sync_state_across_reopen() {
    let test_store = TestStore::file();
    let first = coordinator(
        Arc::clone(&test_store.store),
        ScriptedFetcher::returning(sample_users()),
    );
    first.refresh().await;

    let reopened = coordinator(
        Arc::new(test_store.reopen()),
        ScriptedFetcher::failing("offline"),
    );
    assert_eq!(reopened.last_sync_time(), Some(START));
    assert_eq!(reopened.users_matching(UserFilter::Online).unwrap().len(), 5);

    let outcome = reopened.refresh().await;
    assert!(outcome.is_stale());
    assert_eq!(outcome.records().unwrap().len(), 5);
}

#[tokio::test]
async fn watch_emits_once_per_refresh() {
    let coordinator = SyncCoordinator::new(
        SyncConfig::new().with_ledger_ttl(Some(Duration::from_secs(86_400))),
        Arc::new(LocalStore::in_memory()),
        ScriptedFetcher::returning(sample_users()),
        clock(),
    );
    let mut online = coordinator.watch_users(UserFilter::Online).unwrap();
    assert_eq!(online.next().await, Some(Vec::new()));

    coordinator.refresh().await;
    coordinator.refresh().await;
    assert_eq!(online.next().await.unwrap().len(), 5);
    assert_eq!(online.next().await.unwrap().len(), 5);

    coordinator.clock().advance(Duration::from_secs(2 * 86_400));
    assert_eq!(coordinator.sweep_ledger().await.unwrap(), 1);
    assert!(online.try_next().is_none());
}

#[tokio::test]
async fn default_config_keeps_last_sync_time_across_days() {
    let test_store = TestStore::file();
    let coordinator = coordinator(
        Arc::clone(&test_store.store),
        ScriptedFetcher::returning(sample_users()),
    );
    assert!(coordinator.refresh().await.is_success());

    coordinator.clock().advance(Duration::from_secs(25 * 3_600));
    assert_eq!(coordinator.last_sync_time(), Some(START));
    assert!(!coordinator.is_data_stale(Duration::from_secs(48 * 3_600)));
    assert!(coordinator.is_stale());
    assert_eq!(coordinator.sync_status().to_string(), "Last sync: 25h ago");

    assert_eq!(coordinator.sweep_ledger().await.unwrap(), 0);
    let reopened = test_store.reopen();
    assert!(reopened.ledger_entry(LAST_SYNC_KEY).unwrap().is_some());
}

#[tokio::test]
async fn custom_ledger_key_and_ttl() {
    let store = Arc::new(LocalStore::in_memory());
    let clock = clock();
    let coordinator = SyncCoordinator::new(
        SyncConfig::new()
            .with_last_sync_key("users_cache")
            .with_ledger_ttl(None),
        Arc::clone(&store),
        ScriptedFetcher::returning(sample_users()),
        Arc::clone(&clock),
    );
    coordinator.refresh().await;

    assert!(store.ledger_entry(LAST_SYNC_KEY).unwrap().is_none());
    let entry = store.ledger_entry("users_cache").unwrap().unwrap();
    assert!(entry.expires_at.is_none());

    clock.advance(Duration::from_secs(365 * 86_400));
    assert_eq!(coordinator.last_sync_time(), Some(START));
    assert_eq!(coordinator.sweep_ledger().await.unwrap(), 0);
}

#[tokio::test]
async fn simulated_remote_end_to_end() {
    let store = Arc::new(LocalStore::in_memory());
    let fetcher = SimulatedFetcher::new(
        SimulatedFetcherConfig::new()
            .with_latency(Duration::ZERO)
            .with_failure_rate(0.0),
    );
    let coordinator = coordinator(Arc::clone(&store), fetcher);

    assert!(coordinator.refresh().await.is_success());
    assert_eq!(coordinator.users_matching(UserFilter::Online).unwrap().len(), 12);
    let names: Vec<String> = coordinator.users().unwrap().into_iter().map(|u| u.name).collect();
    assert_eq!(names.first().map(String::as_str), Some("Alice Brown"));
    assert_eq!(names.last().map(String::as_str), Some("Tom Wilson"));

    let offline = coordinator_with_failing_simulation(Arc::clone(&store));
    let outcome = offline.refresh().await;
    assert!(outcome.is_stale());
    assert_eq!(outcome.records().unwrap().len(), 12);
}

fn coordinator_with_failing_simulation(
    store: Arc<LocalStore>,
) -> SyncCoordinator<LocalStore, SimulatedFetcher, Arc<ManualClock>> {
    let fetcher = SimulatedFetcher::new(
        SimulatedFetcherConfig::new()
            .with_latency(Duration::ZERO)
            .with_failure_rate(1.0),
    );
    coordinator(store, fetcher)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn refresh_reconciles_any_table(
        table in stored_table_strategy(12),
        batch in remote_batch_strategy(12),
    ) {
        let store = Arc::new(LocalStore::in_memory());
        store.upsert_users(&table).unwrap();
        let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::returning(batch.clone()));

        prop_assert!(block_on(coordinator.refresh()).is_success());
        let after = store.all_users().unwrap();

        let batch_ids: BTreeSet<UserId> = batch.iter().map(|u| u.id).collect();
        let table_ids: BTreeSet<UserId> = table.iter().map(|u| u.id).collect();
        prop_assert_eq!(after.len(), batch_ids.union(&table_ids).count());

        for record in &after {
            prop_assert!(record.is_cached);
            prop_assert_eq!(record.is_online, batch_ids.contains(&record.id));
        }
        for fetched in &batch {
            let stored = store.user(fetched.id).unwrap().unwrap();
            prop_assert_eq!(&stored.name, &fetched.name);
            prop_assert_eq!(stored.last_sync_time, Some(START));
        }

        prop_assert!(block_on(coordinator.refresh()).is_success());
        prop_assert_eq!(store.all_users().unwrap(), after);
    }

    #[test]
    fn failed_fetch_never_mutates(table in stored_table_strategy(12)) {
        let store = Arc::new(LocalStore::in_memory());
        store.upsert_users(&table).unwrap();
        let before = store.all_users().unwrap();
        let coordinator = coordinator(Arc::clone(&store), ScriptedFetcher::failing("offline"));

        let outcome = block_on(coordinator.refresh());
        prop_assert_eq!(store.all_users().unwrap(), before.clone());
        if before.is_empty() {
            prop_assert_eq!(outcome.failure_reason(), Some(FailureReason::NoConnectivityEmptyCache));
        } else {
            prop_assert!(outcome.is_stale());
            prop_assert_eq!(outcome.records().unwrap(), before.as_slice());
        }
    }
}
