//! Live user snapshots for reactive readers.
//!
//! Every committed transaction that touches the user table is turned into
//! one filtered snapshot per subscriber. Snapshots are full listings, not
//! deltas, so a reader that subscribes late (or re-subscribes) only needs
//! the most recent item to render.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut watch = store.watch_users(UserFilter::Online)?;
//! while let Some(users) = watch.next().await {
//!     render(&users);
//! }
//! ```

use crate::model::{UserFilter, UserId, UserRecord};
use crate::store::sorted_users;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

struct Subscriber {
    filter: UserFilter,
    tx: UnboundedSender<Vec<UserRecord>>,
}

/// Distributes user snapshots to subscribers.
///
/// The feed:
/// - Emits only committed state
/// - Preserves commit order
/// - Supports multiple subscribers
/// - Drops subscribers whose watch was dropped
#[derive(Default)]
pub struct SnapshotFeed {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SnapshotFeed {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and delivers `current` to it immediately.
    ///
    /// Callers must hold their table lock so no commit slips in between the
    /// initial snapshot and registration.
    pub fn subscribe(
        &self,
        filter: UserFilter,
        current: &BTreeMap<UserId, UserRecord>,
    ) -> UserWatch {
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(sorted_users(current.values(), filter));
        self.subscribers.lock().push(Subscriber { filter, tx });
        UserWatch { filter, rx }
    }

    /// Sends the committed user table to every live subscriber.
    pub fn publish(&self, users: &BTreeMap<UserId, UserRecord>) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| {
            subscriber
                .tx
                .send(sorted_users(users.values(), subscriber.filter))
                .is_ok()
        });
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// An unbounded stream of user snapshots.
#[derive(Debug)]
pub struct UserWatch {
    filter: UserFilter,
    rx: UnboundedReceiver<Vec<UserRecord>>,
}

impl UserWatch {
    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the store is dropped.
    pub async fn next(&mut self) -> Option<Vec<UserRecord>> {
        self.rx.recv().await
    }

    /// Returns a pending snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Vec<UserRecord>> {
        self.rx.try_recv().ok()
    }

    /// Drains pending snapshots and returns the newest one.
    pub fn latest(&mut self) -> Option<Vec<UserRecord>> {
        let mut latest = None;
        while let Some(snapshot) = self.try_next() {
            latest = Some(snapshot);
        }
        latest
    }

    /// Returns the filter this watch applies.
    pub fn filter(&self) -> UserFilter {
        self.filter
    }
}
