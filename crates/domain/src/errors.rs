//! Error types for configuration handling

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ConfigError {
    #[error("Invalid value for '{0}': {1}")]
    Invalid(String, String),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to read config: {0}")]
    Io(String),
}

impl ConfigError {
    /// Create an invalid-value error for a dotted field path
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid(field.into(), message.into())
    }

    /// Field path of an invalid-value error
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Invalid(field, _) => Some(field),
            _ => None,
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
