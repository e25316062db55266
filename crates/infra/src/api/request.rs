//! Request and response types
//!
//! [`RequestConfig`] is what callers and interceptors build; once it reaches
//! the executor it is treated as immutable. Header names are stored
//! lowercase so per-request headers override defaults regardless of case.

use std::collections::BTreeMap;
use std::time::Duration;

use mentorlink_domain::{Endpoint, HttpMethod};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::ApiError;

/// How the response body is decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Binary,
}

/// One file in a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Multipart payload
///
/// Kept as plain data so a request can be replayed; the transport builds a
/// fresh `reqwest` form for every attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a file part
    pub fn file(
        mut self,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.files.push(FilePart {
            field_name: field_name.into(),
            file_name: file_name.into(),
            content_type: None,
            data,
        });
        self
    }

    /// Set the content type of the most recently added file
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        if let Some(file) = self.files.last_mut() {
            file.content_type = Some(content_type.into());
        }
        self
    }
}

/// Request payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    Multipart(MultipartForm),
}

impl RequestBody {
    /// Serialize a value into a JSON body
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A request as it flows through the client pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL; absolute after
    /// normalization
    pub url: String,
    /// Lowercase header names
    pub headers: BTreeMap<String, String>,
    /// Query parameters
    pub params: BTreeMap<String, String>,
    pub body: RequestBody,
    /// Falls back to the client timeout when unset
    pub timeout: Option<Duration>,
    pub response_type: ResponseType,
    /// Consult and populate the response cache (GET only)
    pub use_cache: bool,
}

impl RequestConfig {
    /// Request with an empty body and default options
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            body: RequestBody::Empty,
            timeout: None,
            response_type: ResponseType::Json,
            use_cache: true,
        }
    }

    /// GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// PUT request
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// PATCH request
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    /// DELETE request
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Request for a catalog endpoint
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        Self::new(to_method(endpoint.method()), endpoint.path())
    }

    /// Set a header, replacing any value under the same name
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// In-place form of [`header`](Self::header)
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Header value by case-insensitive name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Add a query parameter
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Replace the body
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Serialize `value` as the JSON body
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ApiError> {
        Ok(self.body(RequestBody::json(value)?))
    }

    /// Per-request timeout overriding the client default
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// How the response body is decoded
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Bypass the response cache for this request
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Deterministic cache key: method, resolved URL and serialized params
    pub fn cache_key(&self) -> String {
        let params = serde_json::to_string(&self.params).unwrap_or_default();
        format!("{} {} {}", self.method, self.url, params)
    }
}

impl From<&str> for RequestConfig {
    fn from(url: &str) -> Self {
        Self::get(url)
    }
}

impl From<String> for RequestConfig {
    fn from(url: String) -> Self {
        Self::get(url)
    }
}

impl From<Endpoint> for RequestConfig {
    fn from(endpoint: Endpoint) -> Self {
        Self::for_endpoint(&endpoint)
    }
}

/// Map a catalog method onto the transport's method type
pub fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// No body (204/205 or an empty JSON body)
    Empty,
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            Self::Text(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    /// JSON view of the body; `Empty` maps to `null`
    pub fn to_json(&self) -> Result<Value, ApiError> {
        match self {
            Self::Empty => Ok(Value::Null),
            Self::Json(value) => Ok(value.clone()),
            Self::Text(text) => Ok(serde_json::from_str(text)?),
            Self::Binary(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

/// A completed response, owned by the caller
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub data: ResponseData,
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    /// The request that produced this response
    pub config: RequestConfig,
}

impl ResponseEnvelope {
    /// Deserialize the body; 204/205 bodies deserialize from `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let value = self.data.to_json()?;
        serde_json::from_value(value).map_err(|e| {
            ApiError::serialization(format!(
                "Failed to parse response from {} ({}): {e}",
                self.config.url, self.status
            ))
            .with_source(e)
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Server-pushed cache invalidation signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationMessage {
    /// Substring (or expression when `regex` is set) matched against keys
    pub pattern: String,
    #[serde(default)]
    pub regex: bool,
}

impl InvalidationMessage {
    /// Match keys containing `pattern`
    pub fn substring(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), regex: false }
    }

    /// Match keys against the regular expression `pattern`
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), regex: true }
    }

    /// Parse a JSON message such as `{"pattern": "/projects/42"}`
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use mentorlink_domain::ProjectId;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_headers_are_case_insensitive() {
        let config = RequestConfig::get("/projects")
            .header("Content-Type", "text/plain")
            .header("content-type", "application/xml");
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.header_value("CONTENT-TYPE"), Some("application/xml"));
    }

    #[test]
    fn test_cache_key_includes_params_deterministically() {
        let a = RequestConfig::get("https://api/projects").param("page", 2).param("size", 10);
        let b = RequestConfig::get("https://api/projects").param("size", 10).param("page", 2);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), r#"GET https://api/projects {"page":"2","size":"10"}"#);

        let c = RequestConfig::get("https://api/projects").param("page", 3);
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_for_endpoint() {
        let config = RequestConfig::for_endpoint(&Endpoint::UpdateProject(ProjectId(4)));
        assert_eq!(config.method, Method::PUT);
        assert_eq!(config.url, "/projects/4");

        let config: RequestConfig = Endpoint::ListMentors.into();
        assert_eq!(config.method, Method::GET);
    }

    #[test]
    fn test_json_body() {
        let config = RequestConfig::post("/sessions").json(&json!({"mentor_id": 7})).unwrap();
        assert_eq!(config.body, RequestBody::Json(json!({"mentor_id": 7})));
    }

    #[test]
    fn test_multipart_builder() {
        let form = MultipartForm::new()
            .text("title", "pitch deck")
            .file("file", "deck.pdf", vec![1, 2, 3])
            .content_type("application/pdf");
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.files[0].content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_response_data_to_json() {
        assert_eq!(ResponseData::Empty.to_json().unwrap(), Value::Null);
        assert_eq!(ResponseData::Text("{\"a\":1}".into()).to_json().unwrap(), json!({"a": 1}));
        assert!(ResponseData::Text("not json".into()).to_json().is_err());
    }

    #[test]
    fn test_envelope_json_from_empty() {
        let envelope = ResponseEnvelope {
            data: ResponseData::Empty,
            status: StatusCode::NO_CONTENT,
            status_text: "No Content".into(),
            headers: HeaderMap::new(),
            config: RequestConfig::delete("/projects/1"),
        };
        assert!(envelope.json::<()>().is_ok());
        assert_eq!(envelope.json::<Option<u32>>().unwrap(), None);
        assert!(envelope.json::<Vec<u32>>().is_err());
    }

    #[test]
    fn test_invalidation_message_parsing() {
        let msg = InvalidationMessage::from_json(r#"{"pattern": "/projects/42"}"#).unwrap();
        assert_eq!(msg, InvalidationMessage::substring("/projects/42"));

        let msg = InvalidationMessage::from_json(r#"{"pattern": "^GET", "regex": true}"#).unwrap();
        assert!(msg.regex);
        assert!(InvalidationMessage::from_json("{}").is_err());
    }
}
