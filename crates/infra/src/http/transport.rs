use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::api::{RequestBody, RequestConfig};

/// Default timeout used when a request carries none
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures below the HTTP status level
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Undecoded response as received from the network
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Performs one network exchange for a fully prepared request
///
/// Implementations must not retry; the client owns retry policy. Any HTTP
/// status, including errors, is returned as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestConfig) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    fn build_request(&self, request: &RequestConfig) -> Result<reqwest::Request, TransportError> {
        let is_multipart = matches!(request.body, RequestBody::Multipart(_));

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            // reqwest sets the multipart boundary itself
            if is_multipart && name == "content-type" {
                continue;
            }
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = self.client.request(request.method.clone(), &request.url).headers(headers);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Text(text) => builder.body(text.clone()),
            RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
            RequestBody::Multipart(form) => {
                let mut multipart = Form::new();
                for (name, value) in &form.fields {
                    multipart = multipart.text(name.clone(), value.clone());
                }
                for file in &form.files {
                    let mut part = Part::bytes(file.data.clone()).file_name(file.file_name.clone());
                    if let Some(content_type) = &file.content_type {
                        part = part.mime_str(content_type).map_err(|e| {
                            TransportError::InvalidRequest(format!("content type: {e}"))
                        })?;
                    }
                    multipart = multipart.part(file.field_name.clone(), part);
                }
                builder.multipart(multipart)
            }
        };

        builder.build().map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestConfig) -> Result<RawResponse, TransportError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let prepared = self.build_request(request)?;

        let method = prepared.method().clone();
        let url = prepared.url().clone();
        debug!(%method, %url, "sending HTTP request");

        let exchange = async {
            let response =
                self.client.execute(prepared).await.map_err(|e| map_reqwest_error(e, timeout))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?
                .to_vec();
            Ok::<_, TransportError>(RawResponse { status, headers, body })
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => {
                if let Ok(raw) = &result {
                    debug!(%method, %url, status = %raw.status, "received HTTP response");
                }
                result
            }
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    accept_invalid_certs: bool,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, user_agent: None, accept_invalid_certs: false }
    }
}

impl ReqwestTransportBuilder {
    /// Timeout for requests that carry none of their own
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `User-Agent` sent with every request
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Test-only helper to allow insecure TLS (e.g., self-signed certs).
    #[cfg(test)]
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// Build the transport
    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        // Per-request timeouts are enforced in `send`.
        let mut builder = ReqwestClient::builder().no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(ReqwestTransport { client, default_timeout: self.timeout })
    }
}
