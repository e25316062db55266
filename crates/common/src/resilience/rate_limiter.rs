//! Sliding-window rate limiting keyed by request group
//!
//! Each key owns an ordered list of request timestamps. On every check the
//! timestamps older than `window` are pruned; the request is admitted and
//! recorded when fewer than `max_requests` remain, otherwise it is denied.
//! The limiter is local and best-effort: there is no cross-process
//! coordination.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::{Clock, SystemClock};
use crate::error::{CommonError, CommonResult};

/// Configuration for [`SlidingWindowLimiter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Requests admitted per key within one window
    pub max_requests: usize,
    /// Length of the trailing window
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { max_requests: 60, window: Duration::from_secs(60) }
    }
}

impl RateLimiterConfig {
    /// Create a configuration admitting `max_requests` per `window`
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self { max_requests, window }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_requests == 0 {
            return Err(CommonError::config("max_requests", "must be greater than 0"));
        }
        if self.window.is_zero() {
            return Err(CommonError::config("window", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Per-key sliding-window limiter
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use mentorlink_common::resilience::{RateLimiterConfig, SlidingWindowLimiter};
///
/// let limiter = SlidingWindowLimiter::new(RateLimiterConfig::new(2, Duration::from_secs(1)));
/// assert!(limiter.check_and_record("api/projects"));
/// assert!(limiter.check_and_record("api/projects"));
/// assert!(!limiter.check_and_record("api/projects"));
/// assert!(limiter.check_and_record("api/mentors"));
/// ```
#[derive(Debug)]
pub struct SlidingWindowLimiter<C: Clock = SystemClock> {
    config: RateLimiterConfig,
    windows: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    clock: C,
}

impl SlidingWindowLimiter<SystemClock> {
    /// Create a limiter using the system clock
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    /// Create a limiter with a custom clock (useful for testing)
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> Self {
        Self { config, windows: Arc::new(Mutex::new(HashMap::new())), clock }
    }

    /// Limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Admit and record a request for `key`, or deny it
    ///
    /// A key seen for the first time also drops every idle key, so the map
    /// only holds keys active within the window.
    pub fn check_and_record(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut windows = self.windows.lock();
        if !windows.contains_key(key) {
            Self::retain_active(&mut windows, now, self.config.window);
        }
        let window = windows.entry(key.to_string()).or_default();
        Self::prune(window, now, self.config.window);

        if window.len() < self.config.max_requests {
            window.push_back(now);
            true
        } else {
            debug!(key, limit = self.config.max_requests, "rate limit window full");
            false
        }
    }

    /// Like [`check_and_record`](Self::check_and_record) but returns a
    /// [`CommonError::RateLimitExceeded`] on denial
    pub fn try_acquire(&self, key: &str) -> CommonResult<()> {
        if self.check_and_record(key) {
            Ok(())
        } else {
            Err(CommonError::rate_limit(key, self.config.max_requests, self.config.window))
        }
    }

    /// Requests still admissible for `key` in the current window
    pub fn remaining(&self, key: &str) -> usize {
        let now = self.clock.now();
        let mut windows = self.windows.lock();
        match windows.get_mut(key) {
            Some(window) => {
                Self::prune(window, now, self.config.window);
                self.config.max_requests.saturating_sub(window.len())
            }
            None => self.config.max_requests,
        }
    }

    /// Forget the history of one key
    pub fn reset(&self, key: &str) {
        self.windows.lock().remove(key);
    }

    /// Forget every key
    pub fn reset_all(&self) {
        self.windows.lock().clear();
    }

    /// Drop keys whose windows are empty after pruning
    pub fn purge_idle(&self) -> usize {
        let now = self.clock.now();
        let mut windows = self.windows.lock();
        let before = windows.len();
        Self::retain_active(&mut windows, now, self.config.window);
        before - windows.len()
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }

    fn retain_active(
        windows: &mut HashMap<String, VecDeque<Instant>>,
        now: Instant,
        length: Duration,
    ) {
        windows.retain(|_, window| {
            Self::prune(window, now, length);
            !window.is_empty()
        });
    }

    fn prune(window: &mut VecDeque<Instant>, now: Instant, length: Duration) {
        while let Some(oldest) = window.front() {
            if now.saturating_duration_since(*oldest) >= length {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Derive a rate-limit key from a URL path: its first `segments` segments
///
/// `"/projects/42/members"` with 2 segments yields `"projects/42"`; a path
/// shorter than `segments` yields all of it. The root path yields `"/"`.
pub fn path_group_key(path: &str, segments: usize) -> String {
    let key = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .take(segments.max(1))
        .collect::<Vec<_>>()
        .join("/");
    if key.is_empty() {
        "/".to_string()
    } else {
        key
    }
}
