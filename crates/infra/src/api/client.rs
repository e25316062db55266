//! API client orchestrator
//!
//! [`ApiClient`] composes the interceptor chain, the rate limiter, the
//! response cache, the offline queue, retries and token refresh behind one
//! [`request`](ApiClient::request) entry point. It is a cheap `Clone` handle
//! over shared state; construct it once and inject it.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::join_all;
use mentorlink_common::cache::{Cache, CacheConfig, CacheStats, CacheSweeper, KeyPattern};
use mentorlink_common::resilience::{
    path_group_key, BackoffPolicy, Clock, RateLimiterConfig, RetryExecutor, SlidingWindowLimiter,
    SystemClock,
};
use mentorlink_domain::constants::{
    HEALTH_CHECK_TIMEOUT_MS, HEALTH_ENDPOINT, MAX_RETRY_DELAY_MS, MAX_RETRY_JITTER_MS,
};
use mentorlink_domain::{ClientConfig, Endpoint};
use parking_lot::Mutex;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::batch::BatchOutcome;
use super::errors::ApiError;
use super::executor;
use super::interceptors::{
    ErrorInterceptor, InterceptorChain, InterceptorHandle, RequestInterceptor, ResponseInterceptor,
};
use super::offline::{FlushReport, OfflineQueue};
use super::pagination::{Page, PaginateOptions};
use super::request::{
    InvalidationMessage, MultipartForm, RequestBody, RequestConfig, ResponseEnvelope, ResponseType,
};
use crate::auth::{AuthEvent, FileTokenStore, MemoryTokenStore, TokenManager, TokenStore};
use crate::http::{ReqwestTransport, Transport};

/// Clock shared by the cache and the rate limiter
pub type SharedClock = Arc<dyn Clock>;

type ResponseCache = Cache<String, ResponseEnvelope, SharedClock>;

struct ClientInner {
    config: ClientConfig,
    base_url: Url,
    /// Lowercase names
    default_headers: BTreeMap<String, String>,
    transport: Arc<dyn Transport>,
    retry: RetryExecutor,
    cache: ResponseCache,
    _sweeper: Option<CacheSweeper>,
    limiter: SlidingWindowLimiter<SharedClock>,
    offline_queue: OfflineQueue,
    flush_lock: tokio::sync::Mutex<()>,
    online: watch::Sender<bool>,
    tokens: Arc<TokenManager>,
    interceptors: InterceptorChain,
}

/// Resilient HTTP client for the MentorLink API
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("online", &self.is_online())
            .field("queued", &self.inner.offline_queue.len())
            .finish_non_exhaustive()
    }
}

/// Whether a request that finds the client offline may wait in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OfflineMode {
    Queue,
    /// Replays from the queue go straight to the network
    Bypass,
}

impl ApiClient {
    /// Client with default transport, stores and clock
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::builder(config).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Base URL relative paths resolve against, with a trailing slash
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Issue a request through the full pipeline
    ///
    /// Accepts a [`RequestConfig`], a bare path (GET) or an [`Endpoint`].
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] kind; see [`ApiErrorKind`](super::ApiErrorKind).
    pub async fn request(
        &self,
        request: impl Into<RequestConfig>,
    ) -> Result<ResponseEnvelope, ApiError> {
        self.run_pipeline(request.into(), OfflineMode::Queue).await
    }

    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn run_pipeline(
        &self,
        request: RequestConfig,
        offline: OfflineMode,
    ) -> Result<ResponseEnvelope, ApiError> {
        let request = self.normalize(request)?;
        let mut request = self.inner.interceptors.run_request(request).await?;
        request.url = self.resolve_url(&request.url)?;

        self.check_rate_limit(&request)?;

        let cache_key = self.is_cacheable(&request).then(|| request.cache_key());
        if let Some(hit) = cache_key.as_ref().and_then(|key| self.inner.cache.get(key)) {
            debug!("serving response from cache");
            return Ok(hit);
        }

        let offline_enabled = self.inner.config.offline.enabled;
        if offline == OfflineMode::Queue && offline_enabled && !self.is_online() {
            return self.queue_until_online(request).await;
        }

        self.dispatch(request, cache_key).await
    }

    /// Park a request in the offline queue and wait for its replay
    async fn queue_until_online(
        &self,
        request: RequestConfig,
    ) -> Result<ResponseEnvelope, ApiError> {
        let pending = self.inner.offline_queue.enqueue(request)?;
        info!(queued = self.inner.offline_queue.len(), "offline, request queued");
        // Connectivity may have returned between the caller's check and the
        // enqueue, after that transition's flush drained the queue.
        if self.is_online() {
            self.spawn_flush();
        }
        pending.wait().await
    }

    /// Network exchange with retries, response hooks and one refresh on 401
    async fn dispatch(
        &self,
        request: RequestConfig,
        cache_key: Option<String>,
    ) -> Result<ResponseEnvelope, ApiError> {
        let (outcome, sent_token) = self.send_with_retry(&request).await;
        let error = match self.complete(outcome, cache_key.as_deref()).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        if !error.is_unauthorized() || !self.may_refresh(&request) {
            return Err(error);
        }

        if let Err(auth_error) =
            self.inner.tokens.refresh_after_rejection(sent_token.as_deref()).await
        {
            warn!(error = %auth_error, "token refresh failed after 401");
            return Err(error);
        }

        debug!("retrying request with refreshed token");
        let (outcome, _) = self.send_with_retry(&request).await;
        self.complete(outcome, cache_key.as_deref()).await.map_err(|retry_error| {
            if retry_error.is_unauthorized() {
                ApiError::auth("request rejected again after token refresh").with_source(retry_error)
            } else {
                retry_error
            }
        })
    }

    /// Response interceptors, then the cache write or error interceptors
    ///
    /// Only responses accepted by every response interceptor are cached, in
    /// their intercepted form.
    async fn complete(
        &self,
        outcome: Result<ResponseEnvelope, ApiError>,
        cache_key: Option<&str>,
    ) -> Result<ResponseEnvelope, ApiError> {
        match self.inner.interceptors.run_response(outcome).await {
            Ok(response) => {
                if let Some(key) = cache_key {
                    self.inner.cache.insert(key.to_string(), response.clone());
                }
                info!(status = %response.status, "request completed");
                Ok(response)
            }
            Err(error) => Err(self.inner.interceptors.run_error(error).await),
        }
    }

    /// Run the executor under the retry policy
    ///
    /// The access token is read per attempt so a refresh by a concurrent
    /// request is picked up. Returns the token sent with the last attempt.
    async fn send_with_retry(
        &self,
        request: &RequestConfig,
    ) -> (Result<ResponseEnvelope, ApiError>, Option<String>) {
        let sent_token = Mutex::new(None);
        let explicit_auth = request.header_value("authorization").is_some();

        let result = self
            .inner
            .retry
            .execute(|attempt| {
                let mut prepared = request.clone();
                if prepared.timeout.is_none() {
                    prepared.timeout = Some(self.inner.config.timeout());
                }
                if !explicit_auth {
                    let token = self.inner.tokens.get_token();
                    if let Some(token) = &token {
                        prepared.set_header("authorization", format!("Bearer {token}"));
                    }
                    *sent_token.lock() = token;
                }

                debug!(attempt, "sending request");
                let transport = Arc::clone(&self.inner.transport);
                async move { executor::execute(transport.as_ref(), prepared).await }
            })
            .await;

        (result, sent_token.into_inner())
    }

    fn may_refresh(&self, request: &RequestConfig) -> bool {
        self.inner.config.auth.auto_refresh && request.header_value("authorization").is_none()
    }

    /// Resolve the URL and merge default headers; per-request headers win
    fn normalize(&self, mut request: RequestConfig) -> Result<RequestConfig, ApiError> {
        request.url = self.resolve_url(&request.url)?;
        for (name, value) in &self.inner.default_headers {
            request.headers.entry(name.clone()).or_insert_with(|| value.clone());
        }
        Ok(request)
    }

    /// Absolute URLs pass through; anything else joins the base URL
    fn resolve_url(&self, url: &str) -> Result<String, ApiError> {
        if let Ok(absolute) = Url::parse(url) {
            if absolute.has_host() {
                return Ok(absolute.into());
            }
        }
        self.inner
            .base_url
            .join(url.trim_start_matches('/'))
            .map(String::from)
            .map_err(|e| ApiError::config(format!("invalid request URL '{url}': {e}")))
    }

    fn check_rate_limit(&self, request: &RequestConfig) -> Result<(), ApiError> {
        let settings = &self.inner.config.rate_limit;
        if !settings.enabled {
            return Ok(());
        }

        let key = self.rate_limit_key(&request.url, settings.key_segments);
        if self.inner.limiter.check_and_record(&key) {
            Ok(())
        } else {
            warn!(key = %key, "client-side rate limit exceeded");
            Err(ApiError::rate_limited(&key))
        }
    }

    /// Group key from the path below the base URL; other hosts use their
    /// full path
    fn rate_limit_key(&self, url: &str, segments: usize) -> String {
        let Ok(url) = Url::parse(url) else {
            return path_group_key(url, segments);
        };
        let base = &self.inner.base_url;
        let path = match url.path().strip_prefix(base.path()) {
            Some(relative) if url.origin() == base.origin() => relative,
            _ => url.path(),
        };
        path_group_key(path, segments)
    }

    fn is_cacheable(&self, request: &RequestConfig) -> bool {
        self.inner.config.cache.enabled && request.use_cache && request.method == Method::GET
    }

    // Convenience verbs
    // -----------------------------------------------------------------

    /// GET `url`
    pub async fn get(&self, url: &str) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestConfig::get(url)).await
    }

    /// POST `body` as JSON
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestConfig::post(url).json(body)?).await
    }

    /// PUT `body` as JSON
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestConfig::put(url).json(body)?).await
    }

    /// PATCH `body` as JSON
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestConfig::patch(url).json(body)?).await
    }

    /// DELETE `url`
    pub async fn delete(&self, url: &str) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestConfig::delete(url)).await
    }

    /// POST a multipart form
    pub async fn upload(
        &self,
        url: &str,
        form: MultipartForm,
    ) -> Result<ResponseEnvelope, ApiError> {
        self.request(RequestConfig::post(url).body(RequestBody::Multipart(form))).await
    }

    /// GET raw bytes, bypassing the cache
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let request = RequestConfig::get(url).response_type(ResponseType::Binary).no_cache();
        let response = self.request(request).await?;
        Ok(response.data.as_bytes().map(<[u8]>::to_vec).unwrap_or_default())
    }

    /// GET and deserialize the body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.get(url).await?.json()
    }

    /// POST `body` and deserialize the response
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(url, body).await?.json()
    }

    /// Issue a catalog endpoint without a body
    pub async fn call(&self, endpoint: Endpoint) -> Result<ResponseEnvelope, ApiError> {
        self.request(endpoint).await
    }

    /// Run requests concurrently, collecting every outcome in input order
    pub async fn batch<I>(&self, requests: I) -> BatchOutcome
    where
        I: IntoIterator,
        I::Item: Into<RequestConfig>,
    {
        let results = join_all(requests.into_iter().map(|r| self.request(r))).await;
        BatchOutcome::from(results)
    }

    /// Collect items across pages
    ///
    /// Stops when a page reports no more items, is empty or shorter than the
    /// page size, or `max_pages` pages have been fetched.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a zero page size, otherwise the first failed
    /// page's error
    #[instrument(skip(self, options))]
    pub async fn paginate(
        &self,
        url: &str,
        options: &PaginateOptions,
    ) -> Result<Vec<Value>, ApiError> {
        if options.page_size == 0 {
            return Err(ApiError::config("page size must be greater than 0"));
        }

        let mut items = Vec::new();
        let mut page_number = options.start_page;
        let mut fetched = 0u32;

        loop {
            let request = RequestConfig::get(url)
                .param(&options.page_param, page_number)
                .param(&options.size_param, options.page_size);
            let body = self.request(request).await?.data.to_json()?;
            fetched += 1;

            let page = Page::parse(body, options);
            let last = page.is_last(options, fetched);
            items.extend(page.items);
            if last {
                break;
            }
            page_number += 1;
        }

        debug!(pages = fetched, items = items.len(), "pagination complete");
        Ok(items)
    }

    // Interceptors
    // -----------------------------------------------------------------

    /// Append a request interceptor; runs after those already registered
    pub fn add_request_interceptor<I>(&self, interceptor: I) -> InterceptorHandle
    where
        I: RequestInterceptor + 'static,
    {
        self.inner.interceptors.add_request(Arc::new(interceptor))
    }

    /// Append a response interceptor
    pub fn add_response_interceptor<I>(&self, interceptor: I) -> InterceptorHandle
    where
        I: ResponseInterceptor + 'static,
    {
        self.inner.interceptors.add_response(Arc::new(interceptor))
    }

    /// Append an error interceptor
    pub fn add_error_interceptor<I>(&self, interceptor: I) -> InterceptorHandle
    where
        I: ErrorInterceptor + 'static,
    {
        self.inner.interceptors.add_error(Arc::new(interceptor))
    }

    /// Remove an interceptor of any kind; `false` if the handle is unknown
    pub fn remove_interceptor(&self, handle: InterceptorHandle) -> bool {
        self.inner.interceptors.remove(handle)
    }

    // Connectivity
    // -----------------------------------------------------------------

    /// Current connectivity state
    pub fn is_online(&self) -> bool {
        *self.inner.online.borrow()
    }

    /// Receiver tracking online/offline transitions
    pub fn watch_connectivity(&self) -> watch::Receiver<bool> {
        self.inner.online.subscribe()
    }

    /// Record a connectivity change
    ///
    /// Going from offline to online replays the offline queue in a
    /// background task.
    pub fn set_online(&self, online: bool) {
        let was_online = self.inner.online.send_replace(online);
        match (was_online, online) {
            (false, true) => {
                info!(queued = self.inner.offline_queue.len(), "connectivity restored");
                self.spawn_flush();
            }
            (true, false) => warn!("connectivity lost"),
            _ => {}
        }
    }

    fn spawn_flush(&self) {
        match Handle::try_current() {
            Ok(runtime) => {
                let client = self.clone();
                runtime.spawn(async move {
                    client.flush().await;
                });
            }
            Err(_) => warn!("Skipping offline queue flush: no active Tokio runtime detected"),
        }
    }

    /// Replay queued requests in FIFO order
    ///
    /// Each caller receives the outcome of its replay. If connectivity drops
    /// mid-flush the remaining requests go back to the head of the queue.
    pub async fn flush(&self) -> FlushReport {
        let _guard = self.inner.flush_lock.lock().await;
        let mut report = FlushReport::default();
        let mut queued = VecDeque::from(self.inner.offline_queue.drain());

        while let Some(next) = queued.pop_front() {
            if !self.is_online() {
                queued.push_front(next);
                warn!(remaining = queued.len(), "went offline during flush");
                self.inner.offline_queue.requeue_front(Vec::from(queued));
                break;
            }

            let outcome = self.run_pipeline(next.config.clone(), OfflineMode::Bypass).await;
            report.replayed += 1;
            if outcome.is_ok() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
            next.complete(outcome);
        }

        if report.replayed > 0 {
            info!(?report, "offline queue flushed");
        }
        report
    }

    /// Number of requests waiting for connectivity
    pub fn queued_requests(&self) -> usize {
        self.inner.offline_queue.len()
    }

    /// Drop every queued request; their callers receive `Cancelled`
    pub fn clear_offline_queue(&self) -> usize {
        let dropped = self.inner.offline_queue.clear();
        if dropped > 0 {
            warn!(dropped, "offline queue cleared");
        }
        dropped
    }

    /// GET the health endpoint directly, outside the pipeline
    ///
    /// Returns `Ok(false)` for a non-success status.
    ///
    /// # Errors
    ///
    /// Returns `Network` or `Timeout` when no response arrives
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<bool, ApiError> {
        let url = self.resolve_url(HEALTH_ENDPOINT)?;
        let request =
            RequestConfig::get(url).timeout(Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS));

        let response = self.inner.transport.send(&request).await.map_err(|e| {
            warn!(error = %e, "Health check failed");
            ApiError::from(e)
        })?;

        if response.status.is_success() {
            debug!("API is healthy");
            Ok(true)
        } else {
            warn!(status = %response.status, "API returned non-success status");
            Ok(false)
        }
    }

    /// Poll [`health_check`](Self::health_check) and drive
    /// [`set_online`](Self::set_online)
    ///
    /// The task holds no strong reference and exits once every client
    /// handle is dropped. Returns `None` without a tokio runtime.
    pub fn spawn_connectivity_monitor(&self, interval: Duration) -> Option<JoinHandle<()>> {
        let weak = Arc::downgrade(&self.inner);
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("Skipping connectivity monitor start: no active Tokio runtime detected");
                return None;
            }
        };

        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(client) = upgrade(&weak) else { break };
                let online = client.health_check().await.unwrap_or(false);
                client.set_online(online);
            }
            debug!("connectivity monitor stopped");
        }))
    }

    // Cache
    // -----------------------------------------------------------------

    /// Apply a server-pushed invalidation
    ///
    /// # Errors
    ///
    /// Returns `Config` for an invalid regular expression
    pub fn handle_invalidation(&self, message: &InvalidationMessage) -> Result<usize, ApiError> {
        let pattern = if message.regex {
            KeyPattern::regex(&message.pattern).map_err(|e| ApiError::config(e.to_string()))?
        } else {
            KeyPattern::from(message.pattern.as_str())
        };
        let removed = self.inner.cache.invalidate(pattern);
        debug!(pattern = %message.pattern, removed, "cache invalidated");
        Ok(removed)
    }

    /// Consume invalidation messages until the sender closes or every client
    /// handle is dropped
    pub fn spawn_invalidation_listener(
        &self,
        mut messages: mpsc::Receiver<InvalidationMessage>,
    ) -> Option<JoinHandle<()>> {
        let weak = Arc::downgrade(&self.inner);
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("Skipping invalidation listener start: no active Tokio runtime detected");
                return None;
            }
        };

        Some(runtime.spawn(async move {
            while let Some(message) = messages.recv().await {
                let Some(client) = upgrade(&weak) else { break };
                if let Err(e) = client.handle_invalidation(&message) {
                    warn!(error = %e, "ignoring invalid invalidation message");
                }
            }
        }))
    }

    /// Remove cached responses whose key matches `pattern`
    pub fn invalidate_cache(&self, pattern: impl Into<KeyPattern>) -> usize {
        self.inner.cache.invalidate(pattern)
    }

    /// Drop every cached response
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Snapshot of cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    // Auth
    // -----------------------------------------------------------------

    /// Token manager holding the access and refresh tokens
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.inner.tokens
    }

    /// Receive `TokensRefreshed` and `SessionExpired` notifications
    pub fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.tokens.subscribe()
    }
}

fn upgrade(weak: &Weak<ClientInner>) -> Option<ApiClient> {
    weak.upgrade().map(|inner| ApiClient { inner })
}

/// Builder for [`ApiClient`]
pub struct ApiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    session_store: Option<Arc<dyn TokenStore>>,
    durable_store: Option<Arc<dyn TokenStore>>,
    clock: Option<SharedClock>,
    backoff: Option<BackoffPolicy>,
    online: bool,
}

impl ApiClientBuilder {
    fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            session_store: None,
            durable_store: None,
            clock: None,
            backoff: None,
            online: true,
        }
    }

    /// Replace the `reqwest` transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Store for tokens set without `remember` (in memory by default)
    pub fn session_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Store for tokens set with `remember`; overrides `auth.storage_path`
    pub fn durable_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.durable_store = Some(store);
        self
    }

    /// Clock for cache TTL and rate-limit windows
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the backoff derived from `retries` and `retry_delay_ms`
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Initial connectivity state (default online)
    pub fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Build the client
    ///
    /// Starts the cache sweeper when caching is enabled and a tokio runtime
    /// is active.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an invalid configuration or HTTP client
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config;
        config.validate()?;
        let base_url = config.parsed_base_url()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::builder()
                    .timeout(config.timeout())
                    .user_agent(&config.user_agent)
                    .build()?,
            ),
        };

        let clock: SharedClock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let backoff = self.backoff.unwrap_or_else(|| {
            BackoffPolicy::new(config.retries, config.retry_delay())
                .with_max_delay(Duration::from_millis(MAX_RETRY_DELAY_MS))
                .with_max_jitter(Duration::from_millis(MAX_RETRY_JITTER_MS))
        });

        let refresh_url = base_url
            .join(config.auth.refresh_endpoint.trim_start_matches('/'))
            .map_err(|e| ApiError::config(format!("invalid refresh endpoint: {e}")))?;
        let storage_path = &config.auth.storage_path;
        let durable_store: Arc<dyn TokenStore> = match (self.durable_store, storage_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileTokenStore::new(path)),
            (None, None) => Arc::new(MemoryTokenStore::new()),
        };
        let mut tokens = TokenManager::builder(Arc::clone(&transport), refresh_url)
            .token_key(&config.auth.token_key)
            .refresh_token_key(&config.auth.refresh_token_key)
            .durable_store(durable_store)
            .timeout(config.timeout());
        if let Some(store) = self.session_store {
            tokens = tokens.session_store(store);
        }

        let cache_config = CacheConfig::builder()
            .ttl(config.cache.ttl())
            .max_size(config.cache.max_size)
            .sweep_interval(config.cache.sweep_interval())
            .build();
        let cache = Cache::with_clock(cache_config, Arc::clone(&clock));
        let sweeper = if config.cache.enabled {
            CacheSweeper::spawn(cache.clone(), config.cache.sweep_interval())
        } else {
            None
        };

        let limiter = SlidingWindowLimiter::with_clock(
            RateLimiterConfig::new(config.rate_limit.max_requests, config.rate_limit.window()),
            clock,
        );

        let default_headers = config
            .default_headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();

        let (online, _) = watch::channel(self.online);

        info!(base_url = %base_url, "API client initialized");
        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                offline_queue: OfflineQueue::new(config.offline.max_queue_size),
                base_url,
                default_headers,
                transport,
                retry: RetryExecutor::new(backoff),
                cache,
                _sweeper: sweeper,
                limiter,
                flush_lock: tokio::sync::Mutex::new(()),
                online,
                tokens: Arc::new(tokens.build()),
                interceptors: InterceptorChain::new(),
                config,
            }),
        })
    }
}
