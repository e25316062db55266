//! Integration tests for domain configuration and endpoint catalog

use std::time::Duration;

use mentorlink_domain::{ClientConfig, ConfigError, Endpoint, HttpMethod, ProjectId};

/// Validates that a full JSON document maps onto every settings section.
#[test]
fn test_full_json_document() {
    let config: ClientConfig = serde_json::from_str(
        r#"{
            "base_url": "https://api.mentorlink.test/v1",
            "timeout_ms": 10000,
            "retries": 4,
            "retry_delay_ms": 250,
            "default_headers": {"X-Client": "web"},
            "auth": {"token_key": "ml_token", "storage_path": "/tmp/tokens.json"},
            "cache": {"enabled": true, "ttl_ms": 5000, "max_size": 10, "sweep_interval_ms": 0},
            "offline": {"enabled": false},
            "rate_limit": {"max_requests": 5, "window_ms": 1000, "key_segments": 3}
        }"#,
    )
    .expect("valid json");

    assert!(config.validate().is_ok());
    assert_eq!(config.timeout(), Duration::from_secs(10));
    assert_eq!(config.retry_delay(), Duration::from_millis(250));
    assert_eq!(config.default_headers.len(), 1);
    assert_eq!(config.auth.token_key, "ml_token");
    assert!(config.auth.auto_refresh);
    assert_eq!(config.cache.sweep_interval(), Duration::ZERO);
    assert!(!config.offline.enabled);
    assert_eq!(config.rate_limit.window(), Duration::from_secs(1));
    assert_eq!(config.rate_limit.key_segments, 3);
}

/// Validates that catalog paths resolve beneath the configured base URL.
#[test]
fn test_endpoint_paths_resolve_against_base() {
    let base = ClientConfig::new("https://api.mentorlink.test/v1").parsed_base_url().expect("url");
    let endpoint = Endpoint::ProjectMembers(ProjectId(42));

    let resolved = base.join(endpoint.path().trim_start_matches('/')).expect("joinable");
    assert_eq!(resolved.as_str(), "https://api.mentorlink.test/v1/projects/42/members");
    assert_eq!(endpoint.method(), HttpMethod::Get);
}

#[test]
fn test_invalid_config_reports_field() {
    let config = ClientConfig { retries: 0, ..ClientConfig::default() };
    assert_eq!(
        config.validate(),
        Err(ConfigError::invalid("retries", "must allow at least one attempt"))
    );
}
