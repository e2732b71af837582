use crate::ServiceTier;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_MODEL: &str = "us.amazon.nova-2-lite-v1:0";

/// Concurrency levels run in order, each for [`HOURS_PER_LEVEL`].
pub const CONCURRENCY_LEVELS: [usize; 3] = [1, 5, 10];
pub const HOURS_PER_LEVEL: u64 = 32;

/// Target spacing between the starts of two batch rounds.
pub const REQUEST_INTERVAL: Duration = Duration::from_secs(60);

pub const SERVICE_TIERS: [ServiceTier; 3] =
    [ServiceTier::Flex, ServiceTier::Default, ServiceTier::Priority];

pub const MAX_ATTEMPTS: u32 = 3;

/// Throttled requests wait `attempt * THROTTLE_BACKOFF` before the next attempt.
pub const THROTTLE_BACKOFF: Duration = Duration::from_secs(5);

/// Wait before retrying any other failure.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

pub const HEALTH_CHECK_EVERY: u64 = 10;
pub const HEALTH_PAUSE: Duration = Duration::from_secs(10);
pub const MIN_FREE_DISK_BYTES: u64 = 1024 * 1024 * 1024;
pub const MIN_AVAILABLE_MEMORY_BYTES: u64 = 512 * 1024 * 1024;

pub const MAX_TOKENS: u32 = 100;
pub const TEMPERATURE: f64 = 0.7;

/// Bump whenever the persisted [`RunState`](crate::RunState) layout changes.
pub const STATE_VERSION: u32 = 1;
