//! Reference store: in-memory tables with optional snapshot durability.

use crate::clock::Timestamp;
use crate::error::StorageResult;
use crate::feed::{SnapshotFeed, UserWatch};
use crate::model::{LedgerEntry, UserFilter, UserId, UserRecord};
use crate::snapshot::SnapshotFile;
use crate::store::{LedgerStore, RecordStore, SyncStore, Tables, WriteTxn};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// A local store holding users and ledger entries.
///
/// Reads take a shared lock and see only committed state. Writes go
/// through [`SyncStore::write`]: the closure runs on a staged copy, the
/// copy is saved to the snapshot file (for durable stores) and then
/// swapped in while watchers are notified under the same lock.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads and tasks.
///
/// # Example
///
/// ```rust
/// use offsync_storage::{LocalStore, RecordStore, UserId, UserRecord};
///
/// let store = LocalStore::in_memory();
/// store
///     .upsert_users(&[UserRecord::new(UserId::new(1), "Ada", "ada@example.com")])
///     .unwrap();
/// assert_eq!(store.user_count().unwrap(), 1);
/// ```
pub struct LocalStore {
    tables: RwLock<Tables>,
    snapshot: Option<SnapshotFile>,
    feed: SnapshotFeed,
    commits: AtomicU64,
}

impl LocalStore {
    /// Creates an empty store that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot: None,
            feed: SnapshotFeed::new(),
            commits: AtomicU64::new(0),
        }
    }

    /// Opens a durable store backed by the snapshot file at `path`.
    ///
    /// A missing file opens an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let snapshot = SnapshotFile::open(path)?;
        let tables = snapshot.load()?;
        info!(
            path = %path.display(),
            users = tables.users.len(),
            ledger_entries = tables.ledger.len(),
            "opened local store"
        );
        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(snapshot),
            feed: SnapshotFeed::new(),
            commits: AtomicU64::new(0),
        })
    }

    /// Returns the snapshot path for durable stores.
    pub fn path(&self) -> Option<&Path> {
        self.snapshot.as_ref().map(SnapshotFile::path)
    }

    /// Returns the number of transactions committed since open.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Returns the number of live user watches.
    pub fn watcher_count(&self) -> usize {
        self.feed.subscriber_count()
    }
}

impl SyncStore for LocalStore {
    fn write<R, F>(&self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> StorageResult<R>,
    {
        let mut tables = self.tables.write();
        let mut staged = tables.clone();

        let (value, changes) = {
            let mut txn = WriteTxn::new(&mut staged);
            let value = f(&mut txn)?;
            (value, txn.changes())
        };

        if changes.is_empty() {
            return Ok(value);
        }

        if let Some(snapshot) = &self.snapshot {
            snapshot.save(&staged)?;
        }

        *tables = staged;
        let commit = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        if changes.users {
            self.feed.publish(&tables.users);
        }

        debug!(
            commit,
            users_changed = changes.users,
            ledger_changed = changes.ledger,
            users = tables.users.len(),
            "committed transaction"
        );
        Ok(value)
    }
}

impl RecordStore for LocalStore {
    fn users_matching(&self, filter: UserFilter) -> StorageResult<Vec<UserRecord>> {
        Ok(self.tables.read().users_matching(filter))
    }

    fn user(&self, id: UserId) -> StorageResult<Option<UserRecord>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    fn user_count(&self) -> StorageResult<usize> {
        Ok(self.tables.read().users.len())
    }

    fn upsert_users(&self, users: &[UserRecord]) -> StorageResult<()> {
        self.write(|txn| txn.upsert_users(users))
    }

    fn delete_user(&self, id: UserId) -> StorageResult<bool> {
        self.write(|txn| Ok(txn.delete_user(id)))
    }

    fn delete_all_users(&self) -> StorageResult<usize> {
        self.write(|txn| Ok(txn.clear_users()))
    }

    fn watch_users(&self, filter: UserFilter) -> StorageResult<UserWatch> {
        let tables = self.tables.read();
        Ok(self.feed.subscribe(filter, &tables.users))
    }
}

impl LedgerStore for LocalStore {
    fn ledger_entry(&self, key: &str) -> StorageResult<Option<LedgerEntry>> {
        Ok(self.tables.read().ledger.get(key).cloned())
    }

    fn ledger_entries(&self) -> StorageResult<Vec<LedgerEntry>> {
        Ok(self.tables.read().ledger.values().cloned().collect())
    }

    fn put_ledger_entry(&self, entry: LedgerEntry) -> StorageResult<()> {
        self.write(|txn| txn.put_ledger_entry(entry))
    }

    fn delete_ledger_entry(&self, key: &str) -> StorageResult<bool> {
        self.write(|txn| Ok(txn.delete_ledger_entry(key)))
    }

    fn remove_expired_ledger_entries(&self, now: Timestamp) -> StorageResult<usize> {
        self.write(|txn| Ok(txn.remove_expired_ledger_entries(now)))
    }

    fn clear_ledger(&self) -> StorageResult<usize> {
        self.write(|txn| Ok(txn.clear_ledger()))
    }
}
