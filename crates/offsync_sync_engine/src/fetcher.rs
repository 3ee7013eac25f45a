//! Remote fetcher abstraction.

use crate::error::FetchError;
use offsync_storage::UserRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

/// Result of one remote fetch.
pub type FetchResult = Result<Vec<UserRecord>, FetchError>;

/// Opaque source of the authoritative user batch.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP client, simulated remote, scripted mock for
/// testing). Implementations handle their own latency and must report
/// unreachable remotes as [`FetchError`], never by panicking.
pub trait RemoteFetcher: Send + Sync {
    /// Fetches the current batch of users.
    fn fetch(&self) -> impl Future<Output = FetchResult> + Send;
}

impl<F: RemoteFetcher> RemoteFetcher for Arc<F> {
    fn fetch(&self) -> impl Future<Output = FetchResult> + Send {
        (**self).fetch()
    }
}

struct FetchGate {
    entered: Notify,
    release: Semaphore,
}

/// A scripted fetcher for testing.
///
/// Queued responses are served first, in order; once the queue is empty the
/// fallback response is returned on every call.
pub struct ScriptedFetcher {
    queued: Mutex<VecDeque<FetchResult>>,
    fallback: Mutex<FetchResult>,
    calls: AtomicU64,
    gate: Option<FetchGate>,
}

impl ScriptedFetcher {
    /// Creates a fetcher that fails until a response is scripted.
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Err(FetchError::new("no scripted response"))),
            calls: AtomicU64::new(0),
            gate: None,
        }
    }

    /// Creates a fetcher that always returns `users`.
    pub fn returning(users: Vec<UserRecord>) -> Self {
        let fetcher = Self::new();
        fetcher.set_fallback(Ok(users));
        fetcher
    }

    /// Creates a fetcher that always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let fetcher = Self::new();
        fetcher.set_fallback(Err(FetchError::new(message)));
        fetcher
    }

    /// Holds every fetch until [`ScriptedFetcher::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(FetchGate {
            entered: Notify::new(),
            release: Semaphore::new(0),
        });
        self
    }

    /// Sets the response used once the queue is empty.
    pub fn set_fallback(&self, response: FetchResult) {
        *self.fallback.lock() = response;
    }

    /// Queues a response for the next unanswered call.
    pub fn push_response(&self, response: FetchResult) {
        self.queued.lock().push_back(response);
    }

    /// Returns how many fetches were started.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Waits until a gated fetch is in flight.
    ///
    /// Returns immediately for ungated fetchers.
    pub async fn wait_until_fetching(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notified().await;
        }
    }

    /// Lets `count` gated fetches complete.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.release.add_permits(count);
        }
    }
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteFetcher for ScriptedFetcher {
    async fn fetch(&self) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            if let Ok(permit) = gate.release.acquire().await {
                permit.forget();
            }
        }

        let next = self.queued.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.lock().clone())
    }
}
