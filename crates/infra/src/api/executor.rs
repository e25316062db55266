//! Request executor: one network exchange turned into an envelope or error

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use tracing::debug;

use super::errors::ApiError;
use super::request::{RequestConfig, ResponseData, ResponseEnvelope, ResponseType};
use crate::http::{RawResponse, Transport};

/// Send `request` once and decode the result
///
/// Non-success statuses become `Http` errors carrying the body and any
/// `Retry-After` hint.
pub async fn execute(
    transport: &dyn Transport,
    request: RequestConfig,
) -> Result<ResponseEnvelope, ApiError> {
    let raw = transport.send(&request).await?;
    let status = raw.status;

    if !status.is_success() {
        let retry_after = parse_retry_after(&raw.headers);
        let body = String::from_utf8_lossy(&raw.body).into_owned();
        debug!(url = %request.url, %status, "request failed with status");
        return Err(ApiError::from_status(status, &request.url, body).with_retry_after(retry_after));
    }

    let data = decode_body(&raw, request.response_type)?;
    Ok(ResponseEnvelope {
        data,
        status,
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers: raw.headers,
        config: request,
    })
}

fn decode_body(raw: &RawResponse, response_type: ResponseType) -> Result<ResponseData, ApiError> {
    // Handle 204/205 No Content responses
    if raw.status == StatusCode::NO_CONTENT || raw.status == StatusCode::RESET_CONTENT {
        return Ok(ResponseData::Empty);
    }

    match response_type {
        ResponseType::Binary => Ok(ResponseData::Binary(raw.body.clone())),
        ResponseType::Text => String::from_utf8(raw.body.clone())
            .map(ResponseData::Text)
            .map_err(|e| ApiError::serialization(format!("Response is not UTF-8: {e}"))),
        ResponseType::Json if raw.body.iter().all(u8::is_ascii_whitespace) => Ok(ResponseData::Empty),
        ResponseType::Json => serde_json::from_slice(&raw.body).map(ResponseData::Json).map_err(|e| {
            ApiError::serialization(format!("Failed to parse response: {e}")).with_source(e)
        }),
    }
}

/// `Retry-After` in delay-seconds form; HTTP-date values are ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::api::ApiErrorKind;
    use crate::http::TransportError;

    struct FixedTransport {
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
    }

    impl FixedTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status: StatusCode::from_u16(status).expect("valid status"),
                headers: HeaderMap::new(),
                body: body.as_bytes().to_vec(),
            }
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, _request: &RequestConfig) -> Result<RawResponse, TransportError> {
            Ok(RawResponse {
                status: self.status,
                headers: self.headers.clone(),
                body: self.body.clone(),
            })
        }
    }

    #[tokio::test]
    async fn decodes_json() {
        let transport = FixedTransport::new(200, r#"{"id": 42}"#);
        let envelope = execute(&transport, RequestConfig::get("http://x/p/42")).await.unwrap();
        assert_eq!(envelope.data, ResponseData::Json(json!({"id": 42})));
        assert_eq!(envelope.status_text, "OK");
        assert_eq!(envelope.config.url, "http://x/p/42");
    }

    #[tokio::test]
    async fn no_content_is_empty() {
        let transport = FixedTransport::new(204, "");
        let envelope = execute(&transport, RequestConfig::delete("http://x/p/1")).await.unwrap();
        assert_eq!(envelope.data, ResponseData::Empty);
    }

    #[tokio::test]
    async fn text_and_binary() {
        let transport = FixedTransport::new(200, "hello");
        let text = RequestConfig::get("http://x").response_type(ResponseType::Text);
        let envelope = execute(&transport, text).await.unwrap();
        assert_eq!(envelope.data.as_text(), Some("hello"));

        let binary = RequestConfig::get("http://x").response_type(ResponseType::Binary);
        let envelope = execute(&transport, binary).await.unwrap();
        assert_eq!(envelope.data.as_bytes(), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn invalid_json_is_serialization_error() {
        let transport = FixedTransport::new(200, "<html>");
        let err = execute(&transport, RequestConfig::get("http://x")).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Serialization);
    }

    #[tokio::test]
    async fn error_status_carries_retry_after() {
        let mut transport = FixedTransport::new(429, "slow down");
        transport.headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));

        let err = execute(&transport, RequestConfig::get("http://x")).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.body(), Some("slow down"));
        assert_eq!(
            mentorlink_common::error::ErrorClassification::retry_after(&err),
            Some(Duration::from_secs(3))
        );
    }
}
