//! In-memory response cache
//!
//! - **Thread-safe**: `Arc<RwLock<>>` storage shared by clones
//! - **TTL expiry**: lazy on read, eager via [`Cache::cleanup_expired`] and
//!   the background [`CacheSweeper`]
//! - **Bounded**: evicts the oldest-inserted entry when full
//! - **Invalidation**: substring or regular-expression matching over keys
//! - **Metrics**: hit/miss/eviction/expiration/invalidation counters
//! - **Testable**: clock abstraction for deterministic expiry tests
//!
//! # Example
//! ```
//! use std::time::Duration;
//!
//! use mentorlink_common::cache::{Cache, CacheConfig, KeyPattern};
//!
//! let cache: Cache<String, String> =
//!     Cache::new(CacheConfig::ttl_bounded(Duration::from_secs(300), 100));
//! cache.insert("GET /projects/1".to_string(), "{}".to_string());
//! cache.insert("GET /mentors/1".to_string(), "{}".to_string());
//!
//! let pattern = KeyPattern::regex(r"/projects/\d+").unwrap();
//! assert_eq!(cache.invalidate(pattern), 1);
//! ```

mod config;
mod core;
mod stats;
mod sweeper;

pub use self::core::{Cache, KeyPattern};
pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_SWEEP_INTERVAL};
pub use stats::CacheStats;
pub use sweeper::CacheSweeper;
