//! Fault injection for storage failure paths.

use offsync_storage::{
    LedgerEntry, LedgerStore, LocalStore, RecordStore, StorageError, StorageResult, SyncStore,
    Timestamp, UserFilter, UserId, UserRecord, UserWatch, WriteTxn,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const UNLIMITED: u64 = u64::MAX;

/// A store wrapper that fails reads or writes on demand.
///
/// Every read goes through one check and every write through another, so a
/// test can break exactly the phase it wants to observe. Failures are
/// reported as [`StorageError::Unavailable`].
pub struct FaultyStore<S = LocalStore> {
    inner: S,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads_left: AtomicU64,
}

impl FaultyStore<LocalStore> {
    /// Wraps a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(LocalStore::in_memory())
    }
}

impl<S> FaultyStore<S> {
    /// Wraps `inner` with no faults armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            reads_left: AtomicU64::new(UNLIMITED),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Makes every read fail while `fail` is set.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every write fail while `fail` is set.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Lets the next `count` reads through, then fails every read after.
    pub fn fail_reads_after(&self, count: u64) {
        self.reads_left.store(count, Ordering::SeqCst);
    }

    /// Disarms every fault.
    pub fn heal(&self) {
        self.fail_reads(false);
        self.fail_writes(false);
        self.reads_left.store(UNLIMITED, Ordering::SeqCst);
    }

    fn check_read(&self) -> StorageResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("injected read failure"));
        }
        let exhausted = self
            .reads_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .is_err();
        if exhausted {
            return Err(StorageError::unavailable("injected read failure"));
        }
        Ok(())
    }

    fn check_write(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("injected write failure"));
        }
        Ok(())
    }
}

impl<S: RecordStore> RecordStore for FaultyStore<S> {
    fn users_matching(&self, filter: UserFilter) -> StorageResult<Vec<UserRecord>> {
        self.check_read()?;
        self.inner.users_matching(filter)
    }

    fn user(&self, id: UserId) -> StorageResult<Option<UserRecord>> {
        self.check_read()?;
        self.inner.user(id)
    }

    fn user_count(&self) -> StorageResult<usize> {
        self.check_read()?;
        self.inner.user_count()
    }

    fn upsert_users(&self, users: &[UserRecord]) -> StorageResult<()> {
        self.check_write()?;
        self.inner.upsert_users(users)
    }

    fn delete_user(&self, id: UserId) -> StorageResult<bool> {
        self.check_write()?;
        self.inner.delete_user(id)
    }

    fn delete_all_users(&self) -> StorageResult<usize> {
        self.check_write()?;
        self.inner.delete_all_users()
    }

    fn watch_users(&self, filter: UserFilter) -> StorageResult<UserWatch> {
        self.check_read()?;
        self.inner.watch_users(filter)
    }
}

impl<S: LedgerStore> LedgerStore for FaultyStore<S> {
    fn ledger_entry(&self, key: &str) -> StorageResult<Option<LedgerEntry>> {
        self.check_read()?;
        self.inner.ledger_entry(key)
    }

    fn ledger_entries(&self) -> StorageResult<Vec<LedgerEntry>> {
        self.check_read()?;
        self.inner.ledger_entries()
    }

    fn put_ledger_entry(&self, entry: LedgerEntry) -> StorageResult<()> {
        self.check_write()?;
        self.inner.put_ledger_entry(entry)
    }

    fn delete_ledger_entry(&self, key: &str) -> StorageResult<bool> {
        self.check_write()?;
        self.inner.delete_ledger_entry(key)
    }

    fn remove_expired_ledger_entries(&self, now: Timestamp) -> StorageResult<usize> {
        self.check_write()?;
        self.inner.remove_expired_ledger_entries(now)
    }

    fn clear_ledger(&self) -> StorageResult<usize> {
        self.check_write()?;
        self.inner.clear_ledger()
    }
}

impl<S: SyncStore> SyncStore for FaultyStore<S> {
    fn write<R, F>(&self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> StorageResult<R>,
    {
        self.check_write()?;
        self.inner.write(f)
    }
}
