//! Consumer configuration.

use std::time::Duration;

/// Tunables for one [`crate::Consumer`] instance.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Topic to consume.
    pub topic: String,
    /// Consumer group id.
    pub group_id: String,
    /// Topic messages are parked on after retries are exhausted.
    pub dlq_topic: String,
    /// Total processing attempts per message, including the first.
    pub max_retries: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Longest a single fetch blocks before the loop re-checks shutdown.
    pub fetch_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            topic: "arena.events".to_string(),
            group_id: "arena-projector".to_string(),
            dlq_topic: "arena.events.dlq".to_string(),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            fetch_timeout: Duration::from_secs(1),
        }
    }
}

impl ConsumerConfig {
    /// Reads configuration from the environment, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            topic: env_string("KAFKA_TOPIC", defaults.topic),
            group_id: env_string("KAFKA_GROUP_ID", defaults.group_id),
            dlq_topic: env_string("KAFKA_DLQ_TOPIC", defaults.dlq_topic),
            max_retries: env_parse("WORKER_MAX_RETRIES", defaults.max_retries),
            retry_backoff: Duration::from_millis(env_parse(
                "WORKER_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )),
            fetch_timeout: Duration::from_millis(env_parse(
                "WORKER_FETCH_TIMEOUT_MS",
                defaults.fetch_timeout.as_millis() as u64,
            )),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
