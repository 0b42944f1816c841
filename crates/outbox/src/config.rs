//! Relay configuration.

use std::time::Duration;

use common::types::EventId;

/// Tunables for one [`crate::OutboxRelay`] instance.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Identity written into the lease columns of claimed rows.
    pub worker_id: String,
    /// Rows claimed per poll.
    pub batch_size: usize,
    /// How long a claim excludes other relays.
    pub lease_ttl: Duration,
    /// Sleep between polls when the claim comes back empty.
    pub poll_interval: Duration,
    /// Base retry delay; attempt `n` is rescheduled `n * base_backoff`
    /// into the future.
    pub base_backoff: Duration,
    /// Attempt cap before a row is failed and dead-lettered.
    pub max_attempts: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("relay-{}", EventId::new()),
            batch_size: 50,
            lease_ttl: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            base_backoff: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

impl RelayConfig {
    /// Reads configuration from the environment, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_id: std::env::var("OUTBOX_WORKER_ID").unwrap_or(defaults.worker_id),
            batch_size: env_parse("OUTBOX_BATCH_SIZE", defaults.batch_size),
            lease_ttl: Duration::from_secs(env_parse(
                "OUTBOX_LEASE_TTL_SECS",
                defaults.lease_ttl.as_secs(),
            )),
            poll_interval: Duration::from_millis(env_parse(
                "OUTBOX_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )),
            base_backoff: Duration::from_secs(env_parse(
                "OUTBOX_BASE_BACKOFF_SECS",
                defaults.base_backoff.as_secs(),
            )),
            max_attempts: env_parse("OUTBOX_MAX_ATTEMPTS", defaults.max_attempts),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
