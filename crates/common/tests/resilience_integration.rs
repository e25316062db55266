//! Integration tests for resilience module
//!
//! Covers the retry executor against classified errors and the
//! sliding-window limiter under a mock clock.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mentorlink_common::error::{CommonError, ErrorClassification};
use mentorlink_common::resilience::{
    path_group_key, BackoffPolicy, MockClock, RateLimiterConfig, RetryExecutor,
    SlidingWindowLimiter,
};

/// Verifies that classified transient errors are retried until success.
///
/// # Test Steps
/// 1. Fail twice with a timeout (retryable)
/// 2. Succeed on the third attempt
/// 3. Confirm two backoff delays, non-decreasing
#[tokio::test(start_paused = true)]
async fn test_retry_executor_recovers_from_timeouts() {
    let executor = RetryExecutor::new(BackoffPolicy::new(3, Duration::from_millis(200)));
    let attempts = Arc::new(AtomicU32::new(0));

    let outcome = executor
        .execute_with_outcome(|_| {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CommonError::timeout("fetch", Duration::from_secs(1)))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

    assert_eq!(outcome.result, Ok(42));
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.delays.len(), 2);
}

/// Verifies that validation errors are surfaced without retrying.
#[tokio::test(start_paused = true)]
async fn test_retry_executor_stops_on_permanent_error() {
    let executor = RetryExecutor::new(BackoffPolicy::default());
    let attempts = AtomicU32::new(0);

    let result: Result<(), CommonError> = executor
        .execute(|_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(CommonError::validation("body", "missing title")) }
        })
        .await;

    let err = result.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

/// Verifies that local limiter denials are surfaced without retrying.
#[tokio::test(start_paused = true)]
async fn test_retry_executor_does_not_retry_local_rate_limit() {
    let executor = RetryExecutor::new(BackoffPolicy::new(3, Duration::from_millis(10)));
    let limiter = SlidingWindowLimiter::with_clock(
        RateLimiterConfig::new(1, Duration::from_secs(3)),
        MockClock::new(),
    );
    assert!(limiter.try_acquire("projects").is_ok());

    let outcome = executor
        .execute_with_outcome(|_| async { limiter.try_acquire("projects") })
        .await;

    let err = outcome.result.unwrap_err();
    assert!(matches!(err, CommonError::RateLimitExceeded { .. }));
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.delays.is_empty());
}

/// Verifies that the limiter shares one budget per path group.
///
/// # Test Steps
/// 1. Send `max_requests` requests to paths in the same group
/// 2. Confirm the next one is denied while another group is unaffected
/// 3. Advance past the window and confirm the group is admitted again
#[test]
fn test_limiter_groups_paths() {
    let clock = MockClock::new();
    let limiter = SlidingWindowLimiter::with_clock(
        RateLimiterConfig::new(3, Duration::from_millis(1_000)),
        clock.clone(),
    );

    for path in ["/api/projects/1", "/api/projects/2", "/api/projects"] {
        assert!(limiter.check_and_record(&path_group_key(path, 2)));
    }
    assert!(!limiter.check_and_record(&path_group_key("/api/projects/9/members", 2)));
    assert!(limiter.check_and_record(&path_group_key("/api/mentors", 2)));

    clock.advance_millis(1_000);
    assert!(limiter.try_acquire(&path_group_key("/api/projects/3", 2)).is_ok());
}

/// Verifies concurrent callers never exceed the window budget.
#[test]
fn test_limiter_concurrent_budget() {
    let limiter = Arc::new(SlidingWindowLimiter::new(RateLimiterConfig::new(
        50,
        Duration::from_secs(60),
    )));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            std::thread::spawn(move || (0..25).filter(|_| limiter.check_and_record("k")).count())
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().expect("thread panicked")).sum();
    assert_eq!(admitted, 50);
    assert_eq!(limiter.remaining("k"), 0);
}
