//! Auth token lifecycle
//!
//! [`TokenManager`] owns the access/refresh token pair, decides which
//! [`TokenStore`] holds it and performs single-flight refreshes against the
//! refresh endpoint.

mod store;
mod token_manager;

use mentorlink_common::error::CommonError;
use reqwest::StatusCode;
use thiserror::Error;

pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token_manager::{AuthEvent, TokenManager, TokenManagerBuilder};

/// Errors raised by the token manager
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    /// No refresh token is stored
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Tokens were cleared by a concurrent failed refresh or a logout
    #[error("Session was cleared while waiting for refresh")]
    SessionCleared,

    /// The refresh endpoint answered with a non-success status
    #[error("Token refresh rejected with status {status}")]
    RefreshRejected { status: StatusCode },

    /// The refresh call never produced a response
    #[error("Token refresh request failed: {0}")]
    Transport(String),

    /// The refresh response could not be parsed
    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Storage(#[from] CommonError),
}

pub type AuthResult<T> = Result<T, AuthError>;
