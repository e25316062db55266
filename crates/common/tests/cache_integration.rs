//! Integration tests for cache module
//!
//! Exercises TTL expiry, insertion-order eviction, pattern invalidation and
//! concurrent access through the public API.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mentorlink_common::cache::{Cache, CacheConfig, CacheSweeper, KeyPattern};
use mentorlink_common::resilience::MockClock;

fn key(s: &str) -> String {
    s.to_string()
}

/// Verifies the request-cache timeline for a 5s TTL.
///
/// # Test Steps
/// 1. Insert a response for `GET /projects/42`
/// 2. Read it back at 2000ms (hit)
/// 3. Read it again at 6000ms (expired, removed)
#[test]
fn test_ttl_timeline() {
    let clock = MockClock::new();
    let cache: Cache<String, String, MockClock> =
        Cache::with_clock(CacheConfig::ttl(Duration::from_millis(5_000)), clock.clone());
    let k = key("GET https://api.mentorlink.test/projects/42?");

    cache.insert(k.clone(), "{\"id\":42}".to_string());

    clock.set_elapsed(Duration::from_millis(2_000));
    assert_eq!(cache.get(&k).as_deref(), Some("{\"id\":42}"));

    clock.set_elapsed(Duration::from_millis(6_000));
    assert_eq!(cache.get(&k), None);
    assert!(!cache.contains_key(&k));
    assert!(cache.is_empty());
}

/// Validates that capacity overflow evicts by insertion order.
///
/// # Test Steps
/// 1. Fill a cache of size 3
/// 2. Read the oldest entry repeatedly
/// 3. Insert a fourth entry and confirm the oldest was still evicted
#[test]
fn test_capacity_evicts_oldest_inserted() {
    let cache: Cache<String, i32> = Cache::new(CacheConfig::bounded(3));
    cache.insert(key("key1"), 1);
    cache.insert(key("key2"), 2);
    cache.insert(key("key3"), 3);

    for _ in 0..5 {
        assert_eq!(cache.get(&key("key1")), Some(1));
    }
    cache.insert(key("key4"), 4);

    assert_eq!(cache.get(&key("key1")), None);
    assert_eq!(cache.get(&key("key2")), Some(2));
    assert_eq!(cache.len(), 3);

    let stats = cache.stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.max_size, Some(3));
}

/// Validates substring and regex invalidation over request keys.
#[test]
fn test_invalidation_patterns() {
    let cache: Cache<String, i32> = Cache::new(CacheConfig::default());
    for (i, path) in ["/projects/1", "/projects/2", "/projects/2/members", "/mentors/7"]
        .iter()
        .enumerate()
    {
        cache.insert(format!("GET https://api.mentorlink.test{path}?"), i as i32);
    }

    assert_eq!(cache.invalidate("/members"), 1);
    assert_eq!(cache.invalidate("/members"), 0);

    let pattern = KeyPattern::regex(r"/projects/\d+\?$").expect("valid regex");
    assert_eq!(cache.invalidate(pattern.clone()), 2);
    assert_eq!(cache.invalidate(pattern), 0);

    assert_eq!(cache.keys(), vec![key("GET https://api.mentorlink.test/mentors/7?")]);
}

/// Validates concurrent inserts and reads from several threads.
#[test]
fn test_concurrent_access() {
    let cache: Arc<Cache<String, usize>> = Arc::new(Cache::new(CacheConfig::bounded(1_000)));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..100 {
                    let k = format!("t{t}-{i}");
                    cache.insert(k.clone(), i);
                    assert_eq!(cache.get(&k), Some(i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(cache.len(), 800);
    assert_eq!(cache.stats().hits, 800);
}

/// Validates that the sweeper drops expired entries without any reads.
#[tokio::test(start_paused = true)]
async fn test_sweeper_runs_on_interval() {
    let clock = MockClock::new();
    let cache: Cache<String, i32, MockClock> = Cache::with_clock(
        CacheConfig::builder()
            .ttl(Duration::from_secs(1))
            .sweep_interval(Duration::from_millis(500))
            .build(),
        clock.clone(),
    );
    for i in 0..10 {
        cache.insert(format!("k{i}"), i);
    }

    let interval = cache.config().sweep_interval;
    let sweeper = CacheSweeper::spawn(cache.clone(), interval).expect("runtime present");

    clock.advance(Duration::from_secs(2));
    tokio::time::sleep(Duration::from_millis(600)).await;
    tokio::task::yield_now().await;

    assert!(cache.is_empty());
    assert_eq!(cache.stats().expirations, 10);

    sweeper.stop();
}
