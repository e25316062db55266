//! Retry controller with exponential backoff and jitter
//!
//! [`RetryExecutor`] wraps an async operation and re-runs it while its
//! [`RetryPolicy`] says the failure is transient. Delays follow
//! [`BackoffPolicy`]: `base_delay × 2^(attempt-1)` plus a random jitter,
//! capped at `max_delay`. The call stays suspended (tokio sleep) during
//! backoff, and the last failure is surfaced once attempts are exhausted.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::ErrorClassification;

/// Default maximum attempts, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base delay for the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
/// Upper bound applied to every computed delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
/// Jitter is drawn from `[0, DEFAULT_MAX_JITTER)`
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(1_000);

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Determine if the error should be retried and optionally provide a custom
    /// delay
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation with a custom delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Policy that defers to [`ErrorClassification`]
///
/// Retryable errors are retried with backoff; errors carrying a
/// `retry_after` hint are retried after that hint instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifiedRetryPolicy;

impl<E: ErrorClassification> RetryPolicy<E> for ClassifiedRetryPolicy {
    fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::Stop;
        }
        match error.retry_after() {
            Some(delay) => RetryDecision::RetryAfter(delay),
            None => RetryDecision::Retry,
        }
    }
}

impl<E, F> RetryPolicy<E> for F
where
    F: Fn(&E, u32) -> RetryDecision,
{
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        self(error, attempt)
    }
}

/// Exponential backoff with additive jitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry (before jitter)
    pub base_delay: Duration,
    /// Cap applied after jitter
    pub max_delay: Duration,
    /// Exclusive upper bound of the random jitter
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with the given attempt budget and base delay
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay, ..Self::default() }
    }

    /// Override the delay cap
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Override the jitter bound (`Duration::ZERO` disables jitter)
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Deterministic part of the delay after a failed `attempt` (1-based)
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent).min(self.max_delay)
    }

    /// Full delay after a failed `attempt`: base, plus jitter, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        (self.base_delay_for(attempt) + jitter).min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` attempts
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Outcome of a retried execution with per-attempt bookkeeping
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final result: the first success or the last failure
    pub result: Result<T, E>,
    /// Number of attempts made
    pub attempts: u32,
    /// Backoff delays slept between attempts, in order
    pub delays: Vec<Duration>,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }

    /// Total time slept between attempts
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// Executes an async operation under a backoff policy
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor<P = ClassifiedRetryPolicy> {
    backoff: BackoffPolicy,
    policy: P,
}

impl RetryExecutor<ClassifiedRetryPolicy> {
    /// Executor retrying whatever [`ErrorClassification`] marks retryable
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self { backoff, policy: ClassifiedRetryPolicy }
    }
}

impl<P> RetryExecutor<P> {
    /// Executor with a custom retry policy
    pub fn with_policy(backoff: BackoffPolicy, policy: P) -> Self {
        Self { backoff, policy }
    }

    /// Backoff settings in use
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Run `operation` until it succeeds, the policy stops, or attempts run out
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Like [`execute`](Self::execute), also reporting attempts and delays
    pub async fn execute_with_outcome<T, E, F, Fut>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        let mut delays = Vec::new();

        loop {
            attempt += 1;
            debug!(attempt, max_attempts = self.backoff.max_attempts, "executing attempt");

            let error = match operation(attempt).await {
                Ok(value) => return RetryOutcome { result: Ok(value), attempts: attempt, delays },
                Err(error) => error,
            };

            let decision = self.policy.should_retry(&error, attempt);
            if decision == RetryDecision::Stop || !self.backoff.has_attempts_left(attempt) {
                if decision != RetryDecision::Stop {
                    warn!(attempt, error = %error, "retry attempts exhausted");
                }
                return RetryOutcome { result: Err(error), attempts: attempt, delays };
            }

            let delay = match decision {
                RetryDecision::RetryAfter(hint) => hint.min(self.backoff.max_delay),
                _ => self.backoff.delay_for(attempt),
            };
            warn!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "attempt failed, retrying");
            delays.push(delay);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for resilience::retry.
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::{CommonError, ErrorSeverity};

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
        Throttled(Duration),
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl ErrorClassification for TestError {
        fn is_retryable(&self) -> bool {
            !matches!(self, Self::Fatal)
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Warning
        }

        fn is_critical(&self) -> bool {
            false
        }

        fn retry_after(&self) -> Option<Duration> {
            match self {
                Self::Throttled(d) => Some(*d),
                _ => None,
            }
        }
    }

    /// Validates the exponential base delay schedule.
    ///
    /// Assertions:
    /// - Attempt 1, 2, 3 map to 1x, 2x, 4x the base delay.
    /// - Large attempts are capped at `max_delay`.
    #[test]
    fn test_base_delay_schedule() {
        let backoff = BackoffPolicy::new(5, Duration::from_millis(1_000));
        assert_eq!(backoff.base_delay_for(1), Duration::from_millis(1_000));
        assert_eq!(backoff.base_delay_for(2), Duration::from_millis(2_000));
        assert_eq!(backoff.base_delay_for(3), Duration::from_millis(4_000));
        assert_eq!(backoff.base_delay_for(40), DEFAULT_MAX_DELAY);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let backoff = BackoffPolicy::new(3, Duration::from_millis(500));
        for _ in 0..100 {
            let delay = backoff.delay_for(1);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay < Duration::from_millis(1_500));
        }

        let capped = BackoffPolicy::new(3, Duration::from_secs(29));
        for _ in 0..20 {
            assert!(capped.delay_for(1) <= DEFAULT_MAX_DELAY);
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let backoff =
            BackoffPolicy::new(3, Duration::from_millis(100)).with_max_jitter(Duration::ZERO);
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
    }

    /// Validates the transient, transient, success scenario.
    ///
    /// Assertions:
    /// - Exactly three attempts are made and two delays recorded.
    /// - Delays are non-decreasing.
    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let executor = RetryExecutor::new(
            BackoffPolicy::new(3, Duration::from_millis(100)).with_max_jitter(Duration::ZERO),
        );
        let calls = AtomicU32::new(0);

        let outcome = executor
            .execute_with_outcome(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.delays, vec![Duration::from_millis(100), Duration::from_millis(200)]);
        assert_eq!(outcome.result, Ok("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_surfaces_last_error_after_exhaustion() {
        let executor = RetryExecutor::new(BackoffPolicy::new(3, Duration::from_millis(10)));
        let calls = AtomicU32::new(0);

        let result: Result<(), TestError> = executor
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Transient) }
            })
            .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let executor = RetryExecutor::new(BackoffPolicy::default());
        let outcome = executor
            .execute_with_outcome(|_| async { Err::<(), _>(TestError::Fatal) })
            .await;

        assert_eq!(outcome.attempts, 1);
        assert!(outcome.delays.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_is_capped() {
        let executor = RetryExecutor::new(BackoffPolicy::new(2, Duration::from_millis(10)));
        let outcome = executor
            .execute_with_outcome(|attempt| async move {
                if attempt == 1 {
                    Err(TestError::Throttled(Duration::from_secs(120)))
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(outcome.delays, vec![DEFAULT_MAX_DELAY]);
        assert_eq!(outcome.result, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_policy() {
        let executor = RetryExecutor::with_policy(
            BackoffPolicy::new(5, Duration::from_millis(1)),
            |_: &CommonError, attempt: u32| {
                if attempt < 2 {
                    RetryDecision::Retry
                } else {
                    RetryDecision::Stop
                }
            },
        );
        let outcome = executor
            .execute_with_outcome(|_| async { Err::<(), _>(CommonError::internal("boom")) })
            .await;

        assert_eq!(outcome.attempts, 2);
    }
}
