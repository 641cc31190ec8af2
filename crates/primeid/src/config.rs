use crate::{Error, Result};
use core::time::Duration;

/// Smallest identifier issued by default.
pub const DEFAULT_LOWER_BOUND: u64 = 1_000_000_000;

/// Largest ten-digit value. Base primes are sieved up to its square root.
pub const DEFAULT_MAX_IDENTIFIER: u64 = 9_999_999_999;

/// Upper limit accepted for `max_identifier`.
///
/// Keeps the base prime table at or below `2^24` entries.
pub const MAX_SUPPORTED_IDENTIFIER: u64 = 1 << 48;

pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;
pub const DEFAULT_LOW_WATER_MARK: usize = 2048;
pub const DEFAULT_SEGMENT_SIZE: u32 = 1 << 20;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Runtime configuration for an [`Allocator`].
///
/// All fields are public so callers can use struct update syntax on top of
/// [`AllocatorConfig::default`]. Values are checked by [`validate`] when the
/// allocator starts.
///
/// ```
/// use primeid::AllocatorConfig;
///
/// let config = AllocatorConfig {
///     queue_capacity: 100,
///     low_water_mark: 50,
///     ..AllocatorConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
///
/// [`Allocator`]: crate::Allocator
/// [`validate`]: AllocatorConfig::validate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Smallest identifier the allocator will ever issue.
    pub lower_bound: u64,
    /// Largest identifier the allocator will ever issue.
    pub max_identifier: u64,
    /// Capacity of the ready-to-issue pool.
    pub queue_capacity: usize,
    /// Pool depth below which the orchestrator sieves another batch.
    pub low_water_mark: usize,
    /// Width of the numeric range each worker sieves per task.
    pub segment_size: u32,
    /// Number of concurrent sieve workers.
    pub worker_count: usize,
    /// Longest the orchestrator sleeps between pool depth checks.
    pub poll_interval: Duration,
    /// How long `close` waits for background tasks before aborting them.
    pub shutdown_grace: Duration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            lower_bound: DEFAULT_LOWER_BOUND,
            max_identifier: DEFAULT_MAX_IDENTIFIER,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            segment_size: DEFAULT_SEGMENT_SIZE,
            worker_count: num_cpus::get().max(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl AllocatorConfig {
    /// Checks every option against its constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.lower_bound < 2 {
            return Err(config_error(format!(
                "lower_bound ({}) must be at least 2",
                self.lower_bound
            )));
        }
        if self.max_identifier <= self.lower_bound {
            return Err(config_error(format!(
                "max_identifier ({}) must be greater than lower_bound ({})",
                self.max_identifier, self.lower_bound
            )));
        }
        if self.max_identifier > MAX_SUPPORTED_IDENTIFIER {
            return Err(config_error(format!(
                "max_identifier ({}) exceeds the supported maximum ({MAX_SUPPORTED_IDENTIFIER})",
                self.max_identifier
            )));
        }
        if self.queue_capacity == 0 {
            return Err(config_error("queue_capacity must be greater than 0"));
        }
        if self.low_water_mark >= self.queue_capacity {
            return Err(config_error(format!(
                "low_water_mark ({}) must be less than queue_capacity ({})",
                self.low_water_mark, self.queue_capacity
            )));
        }
        if self.segment_size == 0 {
            return Err(config_error("segment_size must be greater than 0"));
        }
        if self.worker_count == 0 {
            return Err(config_error("worker_count must be greater than 0"));
        }
        if self.poll_interval.is_zero() {
            return Err(config_error("poll_interval must be greater than 0"));
        }
        Ok(())
    }

    /// Largest value whose primes must be in the base table so that every
    /// segment up to `max_identifier` can be sieved.
    pub const fn base_prime_limit(&self) -> u64 {
        self.max_identifier.isqrt()
    }
}

fn config_error(reason: impl Into<String>) -> Error {
    Error::Config {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AllocatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lower_bound, 1_000_000_000);
        assert!(config.worker_count >= 1);
        assert_eq!(config.base_prime_limit(), 99_999);
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = AllocatorConfig {
            queue_capacity: 0,
            low_water_mark: 0,
            ..AllocatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn rejects_low_water_mark_at_capacity() {
        let config = AllocatorConfig {
            queue_capacity: 10,
            low_water_mark: 10,
            ..AllocatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn rejects_zero_segment_size() {
        let config = AllocatorConfig {
            segment_size: 0,
            ..AllocatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = AllocatorConfig {
            lower_bound: 500,
            max_identifier: 500,
            ..AllocatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        let config = AllocatorConfig {
            lower_bound: 1,
            ..AllocatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn rejects_oversized_max_identifier() {
        let config = AllocatorConfig {
            max_identifier: MAX_SUPPORTED_IDENTIFIER + 1,
            ..AllocatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn rejects_zero_workers() {
        let config = AllocatorConfig {
            worker_count: 0,
            ..AllocatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }
}
