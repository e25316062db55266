//! Shared helpers for client integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mentorlink_common::resilience::{BackoffPolicy, MockClock};
use mentorlink_domain::ClientConfig;
use mentorlink_infra::ApiClient;
use wiremock::MockServer;

/// Client under test plus the clock driving its cache and rate limiter
pub struct TestClient {
    pub client: ApiClient,
    pub clock: MockClock,
}

/// Configuration pointing at `server` under the `/api` prefix
pub fn test_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(format!("{}/api", server.uri()));
    config.timeout_ms = 2_000;
    config.rate_limit.enabled = false;
    config
}

/// Configuration pointing at a local port with nothing listening
pub fn unreachable_config() -> ClientConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local address").port();
    drop(listener);

    let mut config = ClientConfig::new(format!("http://127.0.0.1:{port}/api"));
    config.timeout_ms = 2_000;
    config.rate_limit.enabled = false;
    config
}

/// Backoff without jitter and with millisecond delays
pub fn fast_backoff(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy::new(max_attempts, Duration::from_millis(5)).with_max_jitter(Duration::ZERO)
}

pub fn build_client(config: ClientConfig) -> TestClient {
    build_client_with(config, |builder| builder)
}

pub fn build_client_with(
    config: ClientConfig,
    customize: impl FnOnce(mentorlink_infra::ApiClientBuilder) -> mentorlink_infra::ApiClientBuilder,
) -> TestClient {
    let clock = MockClock::new();
    let builder = ApiClient::builder(config)
        .backoff(fast_backoff(3))
        .clock(Arc::new(clock.clone()));
    let client = customize(builder).build().expect("client should build");
    TestClient { client, clock }
}

/// Poll `condition` until it holds, failing the test after about a second
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Paths of every request the server received, in arrival order
pub async fn received_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}
