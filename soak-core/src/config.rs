use crate::constants::*;
use crate::ServiceTier;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime};

const STATE_FILE: &str = "run_state.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Region must not be empty")]
    EmptyRegion,

    #[error("Model identifier must not be empty")]
    EmptyModel,

    #[error("At least one concurrency level is required")]
    NoLevels,

    #[error("Concurrency levels must be greater than zero")]
    ZeroConcurrency,

    #[error("At least one service tier is required")]
    NoTiers,

    #[error("Retry policy must allow at least one attempt")]
    ZeroAttempts,
}

/// Everything the driver needs to know about a run.
///
/// Constructed with the compile-time defaults and adjusted through the builder methods. The
/// binary only exposes region, model and paths; the level plan stays fixed.
#[derive(Clone, Debug)]
pub struct SoakConfig {
    pub region: String,
    pub model_id: String,
    pub levels: Vec<usize>,
    pub tiers: Vec<ServiceTier>,
    pub level_duration: Duration,
    pub interval: Duration,
    pub retry: RetryPolicy,
    pub health: HealthConfig,
    pub data_dir: PathBuf,
}

impl SoakConfig {
    pub fn new(region: &str, model_id: &str) -> Self {
        Self {
            region: region.to_string(),
            model_id: model_id.to_string(),
            levels: CONCURRENCY_LEVELS.to_vec(),
            tiers: SERVICE_TIERS.to_vec(),
            level_duration: Duration::from_secs(HOURS_PER_LEVEL * 3600),
            interval: REQUEST_INTERVAL,
            retry: RetryPolicy::default(),
            health: HealthConfig::default(),
            data_dir: default_data_dir(region),
        }
    }

    pub fn levels(mut self, levels: &[usize]) -> Self {
        self.levels = levels.to_vec();
        self
    }

    pub fn tiers(mut self, tiers: &[ServiceTier]) -> Self {
        self.tiers = tiers.to_vec();
        self
    }

    pub fn level_duration(mut self, duration: Duration) -> Self {
        self.level_duration = duration;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn health(mut self, health: HealthConfig) -> Self {
        self.health = health;
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::EmptyRegion);
        }
        if self.model_id.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }
        if self.levels.contains(&0) {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.tiers.is_empty() {
            return Err(ConfigError::NoTiers);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }

    /// Durable log for a run started at `started`. Every process run gets its own file.
    pub fn log_path(&self, started: OffsetDateTime) -> PathBuf {
        let stamp = started
            .format(format_description!(
                "[year][month][day]_[hour][minute][second]"
            ))
            .unwrap_or_else(|_| started.unix_timestamp().to_string());
        self.data_dir
            .join(format!("soak_{}_{stamp}.csv", region_slug(&self.region)))
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }
}

/// Request retry policy. Rate-limit errors back off linearly, everything else waits a fixed delay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub throttle_backoff: Duration,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            throttle_backoff: THROTTLE_BACKOFF,
            retry_delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32, throttled: bool) -> Duration {
        if throttled {
            self.throttle_backoff * attempt
        } else {
            self.retry_delay
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthConfig {
    /// Check on every n-th batch. Zero disables the gate.
    pub every_batches: u64,
    pub pause: Duration,
    pub min_free_disk: u64,
    pub min_available_memory: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            every_batches: HEALTH_CHECK_EVERY,
            pause: HEALTH_PAUSE,
            min_free_disk: MIN_FREE_DISK_BYTES,
            min_available_memory: MIN_AVAILABLE_MEMORY_BYTES,
        }
    }
}

pub fn region_slug(region: &str) -> String {
    region.replace('-', "_")
}

pub fn default_data_dir(region: &str) -> PathBuf {
    Path::new(".").join(format!("soak_data_{}", region_slug(region)))
}
