//! API-specific error types
//!
//! Every failure surfaced by [`ApiClient`](super::ApiClient) is an
//! [`ApiError`]: a kind, the HTTP status where there is one, a message and an
//! optional source. Retry decisions read [`ErrorClassification`] rather than
//! matching on messages.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mentorlink_common::error::{ErrorClassification, ErrorSeverity};
use mentorlink_domain::ConfigError;
use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::AuthError;
use crate::http::TransportError;

/// Categories of API failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No response was received (connection refused, DNS, reset, ...)
    Network,
    /// The request exceeded its timeout
    Timeout,
    /// The server answered with a non-success status
    Http { status: u16 },
    /// Rejected locally by the client-side rate limiter
    RateLimited,
    /// Authentication failed terminally (refresh failed or was rejected)
    Auth,
    /// The offline queue is full
    QueueCapacity,
    /// Invalid client or request configuration
    Config,
    /// A body could not be encoded or decoded
    Serialization,
    /// An interceptor aborted the request
    Interceptor,
    /// The request was dropped before completing
    Cancelled,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Http { status } => write!(f, "HTTP {status}"),
            Self::RateLimited => write!(f, "rate limited"),
            Self::Auth => write!(f, "authentication error"),
            Self::QueueCapacity => write!(f, "offline queue full"),
            Self::Config => write!(f, "configuration error"),
            Self::Serialization => write!(f, "serialization error"),
            Self::Interceptor => write!(f, "interceptor error"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

type BoxedSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// API operation error
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    /// Response body of an HTTP error, when one was read
    body: Option<String>,
    /// Server-provided `Retry-After` hint
    retry_after: Option<Duration>,
    #[source]
    source: Option<BoxedSource>,
}

impl ApiError {
    /// Create an error of the given kind
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), body: None, retry_after: None, source: None }
    }

    /// Connection failure without a response
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    /// No response within `after`
    pub fn timeout(after: Duration) -> Self {
        Self::new(ApiErrorKind::Timeout, format!("request timed out after {after:?}"))
    }

    /// Local limiter denial for `key`
    pub fn rate_limited(key: &str) -> Self {
        Self::new(ApiErrorKind::RateLimited, format!("client rate limit exceeded for '{key}'"))
    }

    /// Authentication failure that a refresh cannot recover
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Auth, message)
    }

    /// Offline queue is full
    pub fn queue_capacity(capacity: usize) -> Self {
        Self::new(
            ApiErrorKind::QueueCapacity,
            format!("offline queue is full ({capacity} requests)"),
        )
    }

    /// Invalid configuration or request
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Config, message)
    }

    /// Body could not be encoded or decoded
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Serialization, message)
    }

    /// Request rejected by an interceptor
    pub fn interceptor(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Interceptor, message)
    }

    /// Queued request dropped before replay
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Cancelled, message)
    }

    /// Error for a non-success response
    pub fn from_status(status: StatusCode, url: &str, body: String) -> Self {
        let message = if body.is_empty() {
            format!("{url} returned status {status}")
        } else {
            format!("{url} returned status {status}: {body}")
        };
        let mut err = Self::new(ApiErrorKind::Http { status: status.as_u16() }, message);
        if !body.is_empty() {
            err.body = Some(body);
        }
        err
    }

    /// Attach a `Retry-After` hint
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Attach the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status for `Http` errors
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ApiErrorKind::Http { status } => Some(status),
            _ => None,
        }
    }

    /// Response body for `Http` errors
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Whether the server answered 401
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

impl ErrorClassification for ApiError {
    fn is_retryable(&self) -> bool {
        match self.kind {
            ApiErrorKind::Network | ApiErrorKind::Timeout => true,
            ApiErrorKind::Http { status } => status >= 500 || status == 429,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self.kind {
            ApiErrorKind::Network
            | ApiErrorKind::Timeout
            | ApiErrorKind::RateLimited
            | ApiErrorKind::QueueCapacity => ErrorSeverity::Warning,
            ApiErrorKind::Http { status } if status >= 500 => ErrorSeverity::Warning,
            ApiErrorKind::Cancelled => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Timeout(_) => ApiErrorKind::Timeout,
            TransportError::Connect(_) | TransportError::Body(_) => ApiErrorKind::Network,
            TransportError::InvalidRequest(_) => ApiErrorKind::Config,
        };
        Self::new(kind, err.to_string()).with_source(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::auth(err.to_string()).with_source(err)
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::config(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string()).with_source(err)
    }
}
