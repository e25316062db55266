//! Resilience primitives used by the MentorLink client
//!
//! - **Clock**: injectable time source ([`SystemClock`], [`MockClock`])
//! - **Retry**: exponential backoff with jitter and a classification-driven
//!   retry policy
//! - **Rate limiting**: per-key sliding windows
//!
//! All components are generic over their error types and read time through
//! [`Clock`] where time matters, so they can be tested without sleeping.

pub mod clock;
pub mod rate_limiter;
pub mod retry;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{path_group_key, RateLimiterConfig, SlidingWindowLimiter};
pub use retry::{
    BackoffPolicy, ClassifiedRetryPolicy, RetryDecision, RetryExecutor, RetryOutcome, RetryPolicy,
};
