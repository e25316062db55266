//! Cache configuration types and builder
//!
//! The cache evicts by insertion order once `max_size` is reached and
//! expires entries whose age reaches `ttl`.

use std::time::Duration;

/// Default interval between background sweeps of expired entries
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for cache behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries (None = unlimited)
    pub max_size: Option<usize>,

    /// Time-to-live for entries (None = no expiration)
    pub ttl: Option<Duration>,

    /// Interval of the background sweeper, when one is spawned
    pub sweep_interval: Duration,

    /// Whether to collect hit/miss/eviction metrics
    pub track_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size: None, ttl: None, sweep_interval: DEFAULT_SWEEP_INTERVAL, track_metrics: true }
    }
}

impl CacheConfig {
    /// Create a new configuration builder
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Quick preset for a TTL-only cache
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use mentorlink_common::cache::CacheConfig;
    ///
    /// let config = CacheConfig::ttl(Duration::from_secs(300));
    /// assert!(config.max_size.is_none());
    /// ```
    pub fn ttl(duration: Duration) -> Self {
        Self { ttl: Some(duration), ..Self::default() }
    }

    /// Quick preset for a size-bounded cache without expiry
    pub fn bounded(max_size: usize) -> Self {
        Self { max_size: Some(max_size), ..Self::default() }
    }

    /// Quick preset combining TTL expiry and a size bound
    pub fn ttl_bounded(ttl: Duration, max_size: usize) -> Self {
        Self { max_size: Some(max_size), ttl: Some(ttl), ..Self::default() }
    }
}

/// Builder for [`CacheConfig`]
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Set the maximum number of entries
    pub fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = Some(size);
        self
    }

    /// Set the entry time-to-live
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = Some(ttl);
        self
    }

    /// Set the sweeper interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Enable or disable metrics
    pub fn track_metrics(mut self, enabled: bool) -> Self {
        self.config.track_metrics = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CacheConfig {
        self.config
    }
}
