//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Use the explicit file when given, otherwise search standard locations
//! 2. Fall back to defaults when no file exists
//! 3. Apply `MENTORLINK_*` environment overrides
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `MENTORLINK_BASE_URL`, `MENTORLINK_TIMEOUT_MS`, `MENTORLINK_USER_AGENT`
//! - `MENTORLINK_RETRIES`, `MENTORLINK_RETRY_DELAY_MS`
//! - `MENTORLINK_AUTH_AUTO_REFRESH`, `MENTORLINK_AUTH_REFRESH_ENDPOINT`,
//!   `MENTORLINK_AUTH_STORAGE_PATH`
//! - `MENTORLINK_CACHE_ENABLED`, `MENTORLINK_CACHE_TTL_MS`,
//!   `MENTORLINK_CACHE_MAX_SIZE`
//! - `MENTORLINK_OFFLINE_ENABLED`, `MENTORLINK_OFFLINE_MAX_QUEUE_SIZE`
//! - `MENTORLINK_RATE_LIMIT_ENABLED`, `MENTORLINK_RATE_LIMIT_MAX_REQUESTS`,
//!   `MENTORLINK_RATE_LIMIT_WINDOW_MS`
//!
//! ## File Locations
//! The loader searches the following paths in the working directory, in order:
//! `mentorlink.toml`, `mentorlink.json`, `config.toml`, `config.json`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use mentorlink_domain::constants::ENV_PREFIX;
use mentorlink_domain::{ClientConfig, ConfigError, ConfigResult};

const CANDIDATE_FILES: [&str; 4] =
    ["mentorlink.toml", "mentorlink.json", "config.toml", "config.json"];

/// Load configuration from the first discovered file, or defaults
///
/// # Errors
/// Returns a [`ConfigError`] if a file exists but cannot be parsed, an
/// override is malformed, or the result fails validation.
pub fn load() -> ConfigResult<ClientConfig> {
    load_from_file(None)
}

/// Load configuration from a file, then apply environment overrides
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`discover_config_path`] and falls back to defaults.
///
/// # Errors
/// Returns `ConfigError::NotFound` when an explicit path does not exist.
pub fn load_from_file(path: Option<PathBuf>) -> ConfigResult<ClientConfig> {
    let config_path = match path {
        Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.display().to_string())),
        Some(p) => Some(p),
        None => discover_config_path(),
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration from file");
            let contents =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
            parse_config(&contents, &path)?
        }
        None => {
            tracing::debug!("No config file found, using defaults");
            ClientConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> ConfigResult<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Invalid JSON format: {e}"))),
        _ => Err(ConfigError::Parse(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing candidate file in the working directory
pub fn discover_config_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    CANDIDATE_FILES.iter().map(|name| cwd.join(name)).find(|path| path.exists())
}

/// Overwrite fields from `MENTORLINK_*` variables that are set
///
/// # Errors
/// Returns `ConfigError::Invalid` naming the field when a value does not
/// parse.
pub fn apply_env_overrides(config: &mut ClientConfig) -> ConfigResult<()> {
    if let Some(value) = env_string("BASE_URL") {
        config.base_url = value;
    }
    if let Some(value) = env_string("USER_AGENT") {
        config.user_agent = value;
    }
    env_parse("TIMEOUT_MS", "timeout_ms", &mut config.timeout_ms)?;
    env_parse("RETRIES", "retries", &mut config.retries)?;
    env_parse("RETRY_DELAY_MS", "retry_delay_ms", &mut config.retry_delay_ms)?;

    env_bool("AUTH_AUTO_REFRESH", &mut config.auth.auto_refresh);
    if let Some(value) = env_string("AUTH_REFRESH_ENDPOINT") {
        config.auth.refresh_endpoint = value;
    }
    if let Some(value) = env_string("AUTH_STORAGE_PATH") {
        config.auth.storage_path = Some(PathBuf::from(value));
    }

    env_bool("CACHE_ENABLED", &mut config.cache.enabled);
    env_parse("CACHE_TTL_MS", "cache.ttl_ms", &mut config.cache.ttl_ms)?;
    env_parse("CACHE_MAX_SIZE", "cache.max_size", &mut config.cache.max_size)?;

    env_bool("OFFLINE_ENABLED", &mut config.offline.enabled);
    env_parse(
        "OFFLINE_MAX_QUEUE_SIZE",
        "offline.max_queue_size",
        &mut config.offline.max_queue_size,
    )?;

    env_bool("RATE_LIMIT_ENABLED", &mut config.rate_limit.enabled);
    env_parse(
        "RATE_LIMIT_MAX_REQUESTS",
        "rate_limit.max_requests",
        &mut config.rate_limit.max_requests,
    )?;
    env_parse("RATE_LIMIT_WINDOW_MS", "rate_limit.window_ms", &mut config.rate_limit.window_ms)?;

    Ok(())
}

fn env_string(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}")).ok().filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(suffix: &str, field: &str, target: &mut T) -> ConfigResult<()>
where
    T::Err: std::fmt::Display,
{
    if let Some(raw) = env_string(suffix) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(field, format!("'{raw}' from environment: {e}")))?;
    }
    Ok(())
}

/// Parse boolean from an environment variable when set
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(suffix: &str, target: &mut bool) {
    if let Some(raw) = env_string(suffix) {
        *target = matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }
}
