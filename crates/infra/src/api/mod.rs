//! MentorLink API client
//!
//! Request pipeline, in order:
//!
//! 1. Normalize: resolve the URL against the base URL, merge default headers
//! 2. Request interceptors
//! 3. Client-side rate limit, keyed by path group
//! 4. Response cache (GET only)
//! 5. Offline queue when disconnected
//! 6. Executor under the retry policy, bearer token attached per attempt
//! 7. Cache write, response interceptors, error interceptors
//! 8. One token refresh and re-issue on 401

mod batch;
pub mod client;
pub mod errors;
mod executor;
pub mod interceptors;
mod offline;
mod pagination;
pub mod request;

pub use batch::BatchOutcome;
pub use client::{ApiClient, ApiClientBuilder, SharedClock};
pub use errors::{ApiError, ApiErrorKind};
pub use executor::execute;
pub use interceptors::{
    ErrorInterceptor, InterceptorChain, InterceptorHandle, RequestInterceptor, ResponseInterceptor,
};
pub use offline::{FlushReport, OfflineQueue, PendingRequest, QueuedRequest};
pub use pagination::PaginateOptions;
pub use request::{
    to_method, FilePart, InvalidationMessage, MultipartForm, RequestBody, RequestConfig,
    ResponseData, ResponseEnvelope, ResponseType,
};
