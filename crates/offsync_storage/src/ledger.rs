//! Expiry policy over ledger storage.

use crate::clock::{Clock, Timestamp};
use crate::error::StorageResult;
use crate::model::LedgerEntry;
use crate::store::LedgerStore;
use std::sync::Arc;
use tracing::debug;

/// Cache ledger with expiry-aware reads.
///
/// Expired entries read as absent but stay in storage until
/// [`CacheLedger::sweep_expired`] runs, so the hot read path never writes.
pub struct CacheLedger<S, C> {
    store: Arc<S>,
    clock: C,
}

impl<S: LedgerStore, C: Clock> CacheLedger<S, C> {
    /// Creates a ledger over `store` using `clock` for expiry checks.
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self { store, clock }
    }

    /// Returns the clock used for expiry checks.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Inserts or replaces `key`.
    pub fn put(
        &self,
        key: &str,
        payload: impl Into<String>,
        expiry: Option<Timestamp>,
    ) -> StorageResult<()> {
        let entry = LedgerEntry::new(key, payload, self.clock.now()).with_expiry(expiry);
        self.store.put_ledger_entry(entry)
    }

    /// Reads `key` if present and not expired.
    pub fn get(&self, key: &str) -> StorageResult<Option<LedgerEntry>> {
        let now = self.clock.now();
        Ok(self
            .store
            .ledger_entry(key)?
            .filter(|entry| !entry.is_expired_at(now)))
    }

    /// Lists every stored entry, expired ones included.
    pub fn entries(&self) -> StorageResult<Vec<LedgerEntry>> {
        self.store.ledger_entries()
    }

    /// Deletes entries whose expiry is before `now`.
    pub fn sweep_expired(&self, now: Timestamp) -> StorageResult<usize> {
        let removed = self.store.remove_expired_ledger_entries(now)?;
        debug!(removed, now = %now, "swept expired ledger entries");
        Ok(removed)
    }

    /// Deletes every entry.
    pub fn clear_all(&self) -> StorageResult<usize> {
        self.store.clear_ledger()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::local::LocalStore;
    use std::time::Duration;

    fn ledger() -> (Arc<LocalStore>, Arc<ManualClock>, CacheLedger<LocalStore, Arc<ManualClock>>) {
        let store = Arc::new(LocalStore::in_memory());
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000)));
        let ledger = CacheLedger::new(Arc::clone(&store), Arc::clone(&clock));
        (store, clock, ledger)
    }

    #[test]
    fn put_and_get() {
        let (_, _, ledger) = ledger();
        ledger.put("users_cache", "users", None).unwrap();

        let entry = ledger.get("users_cache").unwrap().unwrap();
        assert_eq!(entry.payload, "users");
        assert_eq!(entry.created_at, Timestamp::from_millis(1_000));
        assert!(ledger.get("missing").unwrap().is_none());
    }

    #[test]
    fn expired_entry_reads_absent_but_is_kept() {
        let (store, clock, ledger) = ledger();
        ledger
            .put("k", "v", Some(Timestamp::from_millis(1_500)))
            .unwrap();

        clock.advance(Duration::from_millis(501));
        assert!(ledger.get("k").unwrap().is_none());
        assert!(store.ledger_entry("k").unwrap().is_some());
        assert_eq!(ledger.entries().unwrap().len(), 1);
    }

    #[test]
    fn sweep_removes_only_expired() {
        let (_, clock, ledger) = ledger();
        ledger.put("old", "1", Some(Timestamp::from_millis(1_100))).unwrap();
        ledger.put("new", "2", Some(Timestamp::from_millis(9_000))).unwrap();
        ledger.put("forever", "3", None).unwrap();

        clock.advance(Duration::from_secs(1));
        assert_eq!(ledger.sweep_expired(clock.now()).unwrap(), 1);
        let keys: Vec<String> = ledger.entries().unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["forever".to_string(), "new".to_string()]);
    }

    #[test]
    fn clear_all_empties_ledger() {
        let (_, _, ledger) = ledger();
        ledger.put("a", "1", None).unwrap();
        ledger.put("b", "2", None).unwrap();
        assert_eq!(ledger.clear_all().unwrap(), 2);
        assert!(ledger.entries().unwrap().is_empty());
    }
}
