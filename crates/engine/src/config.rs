//! Engine configuration.

use std::time::Duration;

use tracing::warn;

use crate::backoff::RetryPolicy;
use crate::error::EngineError;

const ENV_WORKER_COUNT: &str = "JOBQUEUE_WORKER_COUNT";
const ENV_QUEUE_CAPACITY: &str = "JOBQUEUE_QUEUE_CAPACITY";
const ENV_MAX_RETRIES: &str = "JOBQUEUE_MAX_RETRIES";
const ENV_BACKOFF_MS: &str = "JOBQUEUE_BACKOFF_MS";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name for logging and worker thread names
    pub name: String,
    /// Number of long-lived workers
    pub worker_count: usize,
    /// Work queue capacity; submission blocks when full
    pub queue_capacity: usize,
    /// Maximum attempts per job
    pub max_retries: u32,
    /// Backoff unit; the delay after attempt `n` is `n * backoff_unit`
    pub backoff_unit: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "jobqueue".to_string(),
            worker_count: 5,
            queue_capacity: 100,
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Load configuration from `JOBQUEUE_*` environment variables, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(count) = parse_var(&lookup, ENV_WORKER_COUNT) {
            config.worker_count = count;
        }
        if let Some(capacity) = parse_var(&lookup, ENV_QUEUE_CAPACITY) {
            config.queue_capacity = capacity;
        }
        if let Some(retries) = parse_var(&lookup, ENV_MAX_RETRIES) {
            config.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_BACKOFF_MS) {
            config.backoff_unit = Duration::from_millis(ms);
        }

        config
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.worker_count == 0 {
            return Err(EngineError::InvalidConfig(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(EngineError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.max_retries, self.backoff_unit)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
