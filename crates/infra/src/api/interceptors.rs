//! Interceptor pipeline
//!
//! Three ordered chains: request interceptors rewrite or reject outgoing
//! requests, response interceptors see every outcome (and may recover a
//! failure), error interceptors transform failures before the client's
//! refresh logic runs. Registration returns an [`InterceptorHandle`] for
//! removal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::errors::ApiError;
use super::request::{RequestConfig, ResponseEnvelope};

/// Rewrites an outgoing request, or aborts it by failing
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: RequestConfig) -> Result<RequestConfig, ApiError>;
}

#[async_trait]
impl<F> RequestInterceptor for F
where
    F: Fn(RequestConfig) -> Result<RequestConfig, ApiError> + Send + Sync,
{
    async fn intercept(&self, request: RequestConfig) -> Result<RequestConfig, ApiError> {
        self(request)
    }
}

/// Fulfilled and rejected hooks over a response
///
/// A rejected hook that returns `Ok` recovers the request; later
/// interceptors then see it through their fulfilled hook.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn on_response(&self, response: ResponseEnvelope) -> Result<ResponseEnvelope, ApiError> {
        Ok(response)
    }

    async fn on_error(&self, error: ApiError) -> Result<ResponseEnvelope, ApiError> {
        Err(error)
    }
}

/// Transforms a failure
#[async_trait]
pub trait ErrorInterceptor: Send + Sync {
    async fn intercept(&self, error: ApiError) -> ApiError;
}

#[async_trait]
impl<F> ErrorInterceptor for F
where
    F: Fn(ApiError) -> ApiError + Send + Sync,
{
    async fn intercept(&self, error: ApiError) -> ApiError {
        self(error)
    }
}

/// Identifies a registered interceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorHandle(u64);

type Registered<T> = RwLock<Vec<(InterceptorHandle, Arc<T>)>>;

/// Ordered interceptor lists
///
/// Each run snapshots its list first so no lock is held across an await and
/// interceptors may register or remove others while running.
#[derive(Default)]
pub struct InterceptorChain {
    next_id: AtomicU64,
    request: Registered<dyn RequestInterceptor>,
    response: Registered<dyn ResponseInterceptor>,
    error: Registered<dyn ErrorInterceptor>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("request", &self.request.read().len())
            .field("response", &self.response.read().len())
            .field("error", &self.error.read().len())
            .finish()
    }
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&self) -> InterceptorHandle {
        InterceptorHandle(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_request(&self, interceptor: Arc<dyn RequestInterceptor>) -> InterceptorHandle {
        let handle = self.next_handle();
        self.request.write().push((handle, interceptor));
        handle
    }

    pub fn add_response(&self, interceptor: Arc<dyn ResponseInterceptor>) -> InterceptorHandle {
        let handle = self.next_handle();
        self.response.write().push((handle, interceptor));
        handle
    }

    pub fn add_error(&self, interceptor: Arc<dyn ErrorInterceptor>) -> InterceptorHandle {
        let handle = self.next_handle();
        self.error.write().push((handle, interceptor));
        handle
    }

    /// Remove an interceptor from whichever chain holds it
    ///
    /// Returns `false` if the handle was already removed.
    pub fn remove(&self, handle: InterceptorHandle) -> bool {
        fn remove_from<T: ?Sized>(list: &Registered<T>, handle: InterceptorHandle) -> bool {
            let mut list = list.write();
            let before = list.len();
            list.retain(|(h, _)| *h != handle);
            list.len() != before
        }

        remove_from(&self.request, handle)
            || remove_from(&self.response, handle)
            || remove_from(&self.error, handle)
    }

    pub fn len(&self) -> usize {
        self.request.read().len() + self.response.read().len() + self.error.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run request interceptors in registration order, failing fast
    pub async fn run_request(&self, mut request: RequestConfig) -> Result<RequestConfig, ApiError> {
        for interceptor in snapshot(&self.request) {
            request = interceptor.intercept(request).await?;
        }
        Ok(request)
    }

    /// Run response interceptors over an outcome
    pub async fn run_response(
        &self,
        mut outcome: Result<ResponseEnvelope, ApiError>,
    ) -> Result<ResponseEnvelope, ApiError> {
        for interceptor in snapshot(&self.response) {
            outcome = match outcome {
                Ok(response) => interceptor.on_response(response).await,
                Err(error) => interceptor.on_error(error).await,
            };
        }
        outcome
    }

    /// Run error interceptors in registration order
    pub async fn run_error(&self, mut error: ApiError) -> ApiError {
        for interceptor in snapshot(&self.error) {
            error = interceptor.intercept(error).await;
        }
        error
    }
}

fn snapshot<T: ?Sized>(list: &Registered<T>) -> Vec<Arc<T>> {
    list.read().iter().map(|(_, interceptor)| Arc::clone(interceptor)).collect()
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;

    use super::*;
    use crate::api::{ApiErrorKind, ResponseData};

    fn envelope(value: i64) -> ResponseEnvelope {
        ResponseEnvelope {
            data: ResponseData::Json(serde_json::json!(value)),
            status: StatusCode::OK,
            status_text: "OK".to_string(),
            headers: HeaderMap::new(),
            config: RequestConfig::get("http://x"),
        }
    }

    struct Recover;

    #[async_trait]
    impl ResponseInterceptor for Recover {
        async fn on_error(&self, _error: ApiError) -> Result<ResponseEnvelope, ApiError> {
            Ok(envelope(0))
        }
    }

    struct Double;

    #[async_trait]
    impl ResponseInterceptor for Double {
        async fn on_response(
            &self,
            mut response: ResponseEnvelope,
        ) -> Result<ResponseEnvelope, ApiError> {
            let n = response.data.as_json().and_then(|v| v.as_i64()).unwrap_or_default();
            response.data = ResponseData::Json(serde_json::json!(n * 2 + 1));
            Ok(response)
        }
    }

    type RequestResult = Result<RequestConfig, ApiError>;

    #[tokio::test]
    async fn request_interceptors_run_in_order() {
        let chain = InterceptorChain::new();
        chain.add_request(Arc::new(|r: RequestConfig| -> RequestResult {
            Ok(r.header("x-trace", "a"))
        }));
        chain.add_request(Arc::new(|r: RequestConfig| -> RequestResult {
            let trace = format!("{}b", r.header_value("x-trace").unwrap_or_default());
            Ok(r.header("x-trace", trace))
        }));

        let request = chain.run_request(RequestConfig::get("/projects")).await.unwrap();
        assert_eq!(request.header_value("X-Trace"), Some("ab"));
    }

    #[tokio::test]
    async fn request_interceptor_can_abort() {
        let chain = InterceptorChain::new();
        chain.add_request(Arc::new(|_: RequestConfig| -> RequestResult {
            Err(ApiError::interceptor("blocked"))
        }));
        let ran_after = Arc::new(AtomicU64::new(0));
        let counter = ran_after.clone();
        chain.add_request(Arc::new(move |r: RequestConfig| -> RequestResult {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(r)
        }));

        let err = chain.run_request(RequestConfig::get("/x")).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Interceptor);
        assert_eq!(ran_after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recovered_error_flows_into_later_fulfilled_hooks() {
        let chain = InterceptorChain::new();
        chain.add_response(Arc::new(Recover));
        chain.add_response(Arc::new(Double));

        let response = chain.run_response(Err(ApiError::network("down"))).await.unwrap();
        assert_eq!(response.data.as_json(), Some(&serde_json::json!(1)));
    }

    #[tokio::test]
    async fn error_interceptors_transform_in_order() {
        let chain = InterceptorChain::new();
        chain.add_error(Arc::new(|e: ApiError| ApiError::network(format!("{}+1", e.message()))));
        chain.add_error(Arc::new(|e: ApiError| ApiError::network(format!("{}+2", e.message()))));

        let err = chain.run_error(ApiError::network("base")).await;
        assert_eq!(err.message(), "base+1+2");
    }

    #[tokio::test]
    async fn removed_interceptor_no_longer_runs() {
        let chain = InterceptorChain::new();
        let handle = chain.add_request(Arc::new(|r: RequestConfig| -> RequestResult {
            Ok(r.header("x-a", "1"))
        }));
        assert_eq!(chain.len(), 1);

        assert!(chain.remove(handle));
        assert!(!chain.remove(handle));
        assert!(chain.is_empty());

        let request = chain.run_request(RequestConfig::get("/x")).await.unwrap();
        assert_eq!(request.header_value("x-a"), None);
    }
}
