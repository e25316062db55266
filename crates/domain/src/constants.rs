//! Client constants
//!
//! Defaults used by [`ClientConfig`](crate::ClientConfig) and the client
//! runtime.

// Transport
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_USER_AGENT: &str = concat!("mentorlink-client/", env!("CARGO_PKG_VERSION"));
pub const CONTENT_TYPE_JSON: &str = "application/json";

// Retry
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;
pub const MAX_RETRY_JITTER_MS: u64 = 1_000;

// Auth
pub const DEFAULT_TOKEN_KEY: &str = "auth_token";
pub const DEFAULT_REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const DEFAULT_REFRESH_ENDPOINT: &str = "/auth/refresh";

// Cache
pub const DEFAULT_CACHE_TTL_MS: u64 = 300_000; // 5 minutes
pub const DEFAULT_CACHE_MAX_SIZE: usize = 100;
pub const DEFAULT_CACHE_SWEEP_INTERVAL_MS: u64 = 60_000;

// Offline queue
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 50;

// Rate limiting
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: usize = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
pub const DEFAULT_RATE_LIMIT_KEY_SEGMENTS: usize = 1;

// Connectivity
pub const HEALTH_ENDPOINT: &str = "/health";
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 5_000;

// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "MENTORLINK_";
