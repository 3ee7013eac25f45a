//! Simulated remote source for demos and manual testing.

use crate::error::FetchError;
use crate::fetcher::{FetchResult, RemoteFetcher};
use offsync_storage::{UserId, UserRecord};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Message reported when a simulated fetch fails.
pub const SIMULATED_FAILURE_MESSAGE: &str = "Network connection failed";

/// Configuration for [`SimulatedFetcher`].
#[derive(Debug, Clone)]
pub struct SimulatedFetcherConfig {
    /// Delay before each fetch resolves.
    pub latency: Duration,
    /// Probability in `[0, 1]` that a fetch fails.
    pub failure_rate: f64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl SimulatedFetcherConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            latency: Duration::from_secs(1),
            failure_rate: 0.3,
            seed: None,
        }
    }

    /// Sets the latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the failure rate, clamped to `[0, 1]`.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = clamp_rate(rate);
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SimulatedFetcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

/// Fetcher that sleeps, then fails at random or returns a fixed roster.
pub struct SimulatedFetcher {
    config: SimulatedFetcherConfig,
    roster: Vec<UserRecord>,
    rng: Mutex<StdRng>,
    calls: AtomicU64,
}

impl SimulatedFetcher {
    /// Creates a fetcher serving [`demo_roster`].
    pub fn new(config: SimulatedFetcherConfig) -> Self {
        Self::with_roster(config, demo_roster())
    }

    /// Creates a fetcher serving `roster`.
    pub fn with_roster(config: SimulatedFetcherConfig, roster: Vec<UserRecord>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let failure_rate = clamp_rate(config.failure_rate);
        Self {
            config: SimulatedFetcherConfig {
                failure_rate,
                ..config
            },
            roster,
            rng: Mutex::new(rng),
            calls: AtomicU64::new(0),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SimulatedFetcherConfig {
        &self.config
    }

    /// Returns how many fetches were started.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteFetcher for SimulatedFetcher {
    async fn fetch(&self) -> FetchResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(call, latency_ms = self.config.latency.as_millis() as u64, "simulated fetch started");

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        let failed = self.rng.lock().gen_bool(self.config.failure_rate);
        if failed {
            warn!(call, "simulated fetch failed");
            return Err(FetchError::new(SIMULATED_FAILURE_MESSAGE));
        }

        debug!(call, users = self.roster.len(), "simulated fetch succeeded");
        Ok(self.roster.clone())
    }
}

/// The fixed twelve-user roster served by the demo remote.
pub fn demo_roster() -> Vec<UserRecord> {
    const ROSTER: [(u64, &str, &str, &str, &str); 12] = [
        (1, "John Doe", "john@example.com", "555-0105", "john.web"),
        (2, "Jane Smith", "jane@example.com", "555-0104", "jane.app"),
        (3, "Bob Johnson", "bob@example.com", "555-0102", "bob.tech"),
        (4, "Alice Brown", "alice@example.com", "555-0101", "alice.dev"),
        (5, "David Wilson", "david@example.com", "555-0103", "david.info"),
        (6, "Sarah Connor", "sarah@example.com", "555-0106", "sarah.dev"),
        (7, "Mike Johnson", "mike@example.com", "555-0107", "mike.tech"),
        (8, "Lisa Anderson", "lisa@example.com", "555-0108", "lisa.design"),
        (9, "Tom Wilson", "tom@example.com", "555-0109", "tom.marketing"),
        (10, "Emma Davis", "emma@example.com", "555-0110", "emma.sales"),
        (11, "Chris Brown", "chris@example.com", "555-0111", "chris.support"),
        (12, "Anna Taylor", "anna@example.com", "555-0112", "anna.hr"),
    ];

    ROSTER
        .iter()
        .map(|&(id, name, email, phone, website)| {
            UserRecord::new(UserId::new(id), name, email)
                .with_phone(phone)
                .with_website(website)
        })
        .collect()
}
