//! Common error types and classification for MentorLink crates
//!
//! # Error Handling Architecture
//!
//! 1. **`CommonError`**: error patterns that appear in more than one module
//!    (configuration, persistence, serialization, timeouts, ...).
//! 2. **`ErrorClassification`**: a standard interface for classifying errors
//!    by retryability, severity and suggested retry delay. Retry policies
//!    consult this trait instead of matching on error messages.
//! 3. **`ErrorSeverity`**: a unified severity scale for logging decisions.
//!
//! Module-specific errors compose with `CommonError` rather than duplicating
//! its variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum StoreError {
//!     #[error("Entry is locked: {0}")]
//!     Locked(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Common error variants shared across modules
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommonError {
    /// Configuration-related errors
    #[error("Configuration error in field '{field}': {message}")]
    Config { field: String, message: String },

    /// Serialization or deserialization errors
    #[error("Serialization error ({format}): {message}")]
    Serialization { format: String, message: String },

    /// Data persistence errors (file I/O, key stores, ...)
    #[error("Persistence error during '{operation}': {message}")]
    Persistence { operation: String, message: String },

    /// Rate limiting errors
    #[error("Rate limit exceeded for '{key}': {limit} requests per {window:?}")]
    RateLimitExceeded { key: String, limit: usize, window: Duration },

    /// Timeout errors
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    /// Validation errors
    #[error("Validation error for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CommonError {
    /// Create a configuration error for a specific field
    pub fn config<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Config { field: field.into(), message: message.into() }
    }

    /// Create a serialization error with format information
    pub fn serialization<F: Into<String>, S: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { format: format.into(), message: message.into() }
    }

    /// Create a persistence error for a specific operation
    pub fn persistence<O: Into<String>, S: Into<String>>(operation: O, message: S) -> Self {
        Self::Persistence { operation: operation.into(), message: message.into() }
    }

    /// Create a rate limit error with details
    pub fn rate_limit<K: Into<String>>(key: K, limit: usize, window: Duration) -> Self {
        Self::RateLimitExceeded { key: key.into(), limit, window }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    /// Create a validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl ErrorClassification for CommonError {
    /// Only timeouts; a local rate-limit denial is final for the caller
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. }
            | Self::Serialization { .. }
            | Self::Persistence { .. }
            | Self::Validation { .. } => ErrorSeverity::Error,
            Self::RateLimitExceeded { .. } | Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { window, .. } => Some(*window),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence("io", err.to_string())
    }
}

/// Classification interface implemented by every error type in the workspace
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again: network failures, timeouts, remote throttling, 5xx responses.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when a specific delay is recommended (e.g.
    /// from a `Retry-After` header), or `None` to use the caller's backoff.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
