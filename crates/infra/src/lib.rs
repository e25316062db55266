//! # MentorLink Infrastructure
//!
//! The resilient HTTP client for the MentorLink API.
//!
//! This crate contains:
//! - The API client orchestrator and its request pipeline
//! - The `reqwest` transport
//! - Auth token management and token stores
//! - Configuration loading
//! - Tracing setup
//!
//! ## Architecture
//! - Plain data (configuration, endpoints) comes from `mentorlink-domain`
//! - Cache, retry and rate-limit primitives come from `mentorlink-common`
//! - Contains all "impure" code (network, file and environment I/O)

pub mod api;
pub mod auth;
pub mod config;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, ApiError, ApiErrorKind, BatchOutcome, InvalidationMessage,
    MultipartForm, PaginateOptions, RequestBody, RequestConfig, ResponseData, ResponseEnvelope,
    ResponseType,
};
pub use auth::{AuthError, AuthEvent, FileTokenStore, MemoryTokenStore, TokenManager, TokenStore};
pub use http::{ReqwestTransport, Transport, TransportError};
pub use observability::{init_tracing, LogFormat};
