//! Client configuration
//!
//! Every duration is carried as milliseconds (`*_ms`) so configuration files
//! stay plain numbers; the `Duration` accessors are what the runtime reads.
//! Missing keys fall back to the defaults in [`crate::constants`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::*;
use crate::errors::{ConfigError, ConfigResult};

/// Top-level configuration for the API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL relative request paths are resolved against
    pub base_url: String,
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Maximum attempts per request, including the first
    pub retries: u32,
    /// Base backoff delay
    pub retry_delay_ms: u64,
    /// Headers merged into every request; per-request headers win
    pub default_headers: BTreeMap<String, String>,
    /// `User-Agent` sent by the HTTP transport
    pub user_agent: String,
    pub auth: AuthSettings,
    pub cache: CacheSettings,
    pub offline: OfflineSettings,
    pub rate_limit: RateLimitSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());
        default_headers.insert("Accept".to_string(), CONTENT_TYPE_JSON.to_string());

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            default_headers,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth: AuthSettings::default(),
            cache: CacheSettings::default(),
            offline: OfflineSettings::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base backoff delay
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Parsed base URL
    ///
    /// A trailing slash is added to the path so relative paths resolve
    /// beneath it (`/api` + `projects` = `/api/projects`).
    pub fn parsed_base_url(&self) -> ConfigResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("base_url", e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::invalid("base_url", "must be an absolute http(s) URL"));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Check the configuration for values the client cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        let url = self.parsed_base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid("base_url", "scheme must be http or https"));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("timeout_ms", "must be greater than 0"));
        }
        if self.retries == 0 {
            return Err(ConfigError::invalid("retries", "must allow at least one attempt"));
        }
        if self.auth.refresh_endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("auth.refresh_endpoint", "must not be empty"));
        }
        if self.cache.enabled {
            if self.cache.max_size == 0 {
                return Err(ConfigError::invalid("cache.max_size", "must be greater than 0"));
            }
            if self.cache.ttl_ms == 0 {
                return Err(ConfigError::invalid("cache.ttl_ms", "must be greater than 0"));
            }
        }
        if self.offline.enabled && self.offline.max_queue_size == 0 {
            return Err(ConfigError::invalid("offline.max_queue_size", "must be greater than 0"));
        }
        if self.rate_limit.enabled {
            if self.rate_limit.max_requests == 0 {
                return Err(ConfigError::invalid(
                    "rate_limit.max_requests",
                    "must be greater than 0",
                ));
            }
            if self.rate_limit.window_ms == 0 {
                return Err(ConfigError::invalid("rate_limit.window_ms", "must be greater than 0"));
            }
        }
        Ok(())
    }
}

/// Token storage and refresh settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Storage key of the access token
    pub token_key: String,
    /// Storage key of the refresh token
    pub refresh_token_key: String,
    /// Refresh and re-issue once on a 401
    pub auto_refresh: bool,
    /// Path (relative to `base_url`) receiving `{refresh_token}`
    pub refresh_endpoint: String,
    /// JSON file backing "remembered" tokens; in-memory only when unset
    pub storage_path: Option<PathBuf>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            refresh_token_key: DEFAULT_REFRESH_TOKEN_KEY.to_string(),
            auto_refresh: true,
            refresh_endpoint: DEFAULT_REFRESH_ENDPOINT.to_string(),
            storage_path: None,
        }
    }
}

/// GET response cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_ms: u64,
    pub max_size: usize,
    /// Background sweep interval; `0` disables the sweeper
    pub sweep_interval_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: DEFAULT_CACHE_TTL_MS,
            max_size: DEFAULT_CACHE_MAX_SIZE,
            sweep_interval_ms: DEFAULT_CACHE_SWEEP_INTERVAL_MS,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Offline queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineSettings {
    pub enabled: bool,
    pub max_queue_size: usize,
}

impl Default for OfflineSettings {
    fn default() -> Self {
        Self { enabled: true, max_queue_size: DEFAULT_MAX_QUEUE_SIZE }
    }
}

/// Client-side rate limiting settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub max_requests: usize,
    pub window_ms: u64,
    /// Leading segments of the path below the base URL forming the
    /// rate-limit key
    pub key_segments: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
            key_segments: DEFAULT_RATE_LIMIT_KEY_SEGMENTS,
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}
