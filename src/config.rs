//! Configuration structures for the cache, the striped cache and the
//! thread pool.
//!
//! Each component is created from its dedicated config struct, which keeps
//! required parameters explicit at construction and leaves room to add
//! fields without breaking call sites. Constraints that would make a
//! component unusable (a stripe with no budget, an inverted watermark pair)
//! are rejected up front with a [`ConfigError`] instead of surfacing later
//! as misbehaviour.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Rejected construction-time parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The total byte budget of a striped cache must be positive.
    #[error("cache byte budget must be positive")]
    ZeroBudget,

    /// A striped cache needs at least one stripe.
    #[error("stripe count must be positive")]
    ZeroStripes,

    /// Dividing the budget across stripes left each stripe with nothing.
    #[error("{total} bytes across {stripes} stripes leaves no per-stripe budget")]
    StripeBudgetTooSmall {
        /// Requested total budget in bytes.
        total: usize,
        /// Requested stripe count.
        stripes: usize,
    },

    /// The pool must keep at least one persistent worker.
    #[error("low watermark must be positive")]
    ZeroLowWatermark,

    /// The persistent worker count cannot exceed the worker ceiling.
    #[error("low watermark {low} exceeds high watermark {high}")]
    WatermarkInversion {
        /// Requested persistent worker count.
        low: usize,
        /// Requested worker ceiling.
        high: usize,
    },
}

/// Configuration for a single LRU engine.
///
/// # Examples
///
/// ```
/// use bytecache::config::LruConfig;
///
/// let config = LruConfig::new(1024);
/// assert_eq!(config.max_size, 1024);
/// ```
#[derive(Clone, Copy)]
pub struct LruConfig {
    /// Byte budget: the sum of key and value lengths of all live entries
    /// never exceeds this.
    pub max_size: usize,
}

impl LruConfig {
    /// Creates a configuration with the given byte budget.
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }
}

impl fmt::Debug for LruConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruConfig")
            .field("max_size", &self.max_size)
            .finish()
    }
}

/// Configuration for a striped (lock-per-stripe) cache.
///
/// The total budget is divided equally across the stripes; both the stripe
/// count and the per-stripe share must come out positive.
///
/// # Examples
///
/// ```
/// use bytecache::config::StripedLruConfig;
///
/// let config = StripedLruConfig::new(4096, 4);
/// assert_eq!(config.per_stripe_size().unwrap(), 1024);
/// ```
#[derive(Clone, Copy)]
pub struct StripedLruConfig {
    /// Total byte budget across all stripes.
    pub max_size: usize,
    /// Number of independent stripes.
    pub stripes: usize,
}

impl StripedLruConfig {
    /// Creates a configuration with the given total budget and stripe count.
    ///
    /// Constraints are checked by [`validate`](Self::validate) /
    /// [`per_stripe_size`](Self::per_stripe_size), not here.
    pub fn new(max_size: usize, stripes: usize) -> Self {
        Self { max_size, stripes }
    }

    /// Returns the byte budget of each stripe, `max_size / stripes`.
    pub fn per_stripe_size(&self) -> Result<usize, ConfigError> {
        self.validate()?;
        Ok(self.max_size / self.stripes)
    }

    /// Checks the construction constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if self.stripes == 0 {
            return Err(ConfigError::ZeroStripes);
        }
        if self.max_size / self.stripes == 0 {
            return Err(ConfigError::StripeBudgetTooSmall {
                total: self.max_size,
                stripes: self.stripes,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for StripedLruConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripedLruConfig")
            .field("max_size", &self.max_size)
            .field("stripes", &self.stripes)
            .finish()
    }
}

/// Configuration for the elastic thread pool.
///
/// # Examples
///
/// ```
/// use bytecache::config::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new(2, 4, 64, Duration::from_millis(100));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy)]
pub struct PoolConfig {
    /// Persistent workers kept alive for the pool's whole run.
    pub low_watermark: usize,
    /// Ceiling on concurrently existing workers.
    pub high_watermark: usize,
    /// Submissions are rejected while the queue holds more than this many
    /// pending tasks. Zero is allowed; it makes the pool accept work only
    /// as fast as workers drain it.
    pub max_queue_size: usize,
    /// How long an elastic worker waits for work before exiting.
    pub idle_time: Duration,
}

impl PoolConfig {
    /// Creates a pool configuration.
    pub fn new(
        low_watermark: usize,
        high_watermark: usize,
        max_queue_size: usize,
        idle_time: Duration,
    ) -> Self {
        Self {
            low_watermark,
            high_watermark,
            max_queue_size,
            idle_time,
        }
    }

    /// Checks `0 < low_watermark <= high_watermark`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_watermark == 0 {
            return Err(ConfigError::ZeroLowWatermark);
        }
        if self.low_watermark > self.high_watermark {
            return Err(ConfigError::WatermarkInversion {
                low: self.low_watermark,
                high: self.high_watermark,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("low_watermark", &self.low_watermark)
            .field("high_watermark", &self.high_watermark)
            .field("max_queue_size", &self.max_queue_size)
            .field("idle_time", &self.idle_time)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_config_creation() {
        let config = LruConfig::new(2048);
        assert_eq!(config.max_size, 2048);
    }

    #[test]
    fn test_striped_config_division() {
        let config = StripedLruConfig::new(40, 4);
        assert_eq!(config.per_stripe_size().unwrap(), 10);
    }

    #[test]
    fn test_striped_config_rejects_degenerate_shapes() {
        assert_eq!(
            StripedLruConfig::new(0, 4).validate(),
            Err(ConfigError::ZeroBudget)
        );
        assert_eq!(
            StripedLruConfig::new(40, 0).validate(),
            Err(ConfigError::ZeroStripes)
        );
        assert_eq!(
            StripedLruConfig::new(3, 4).validate(),
            Err(ConfigError::StripeBudgetTooSmall {
                total: 3,
                stripes: 4
            })
        );
    }

    #[test]
    fn test_pool_config_watermarks() {
        let ok = PoolConfig::new(1, 1, 0, Duration::from_millis(1));
        assert!(ok.validate().is_ok());

        let zero_low = PoolConfig::new(0, 4, 8, Duration::from_millis(1));
        assert_eq!(zero_low.validate(), Err(ConfigError::ZeroLowWatermark));

        let inverted = PoolConfig::new(5, 4, 8, Duration::from_millis(1));
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::WatermarkInversion { low: 5, high: 4 })
        );
    }
}
