//! Token manager with single-flight refresh
//!
//! Manages the token lifecycle:
//! - Token retrieval, session store first, then the durable store
//! - `remember` selects which store receives new tokens
//! - Refresh against the refresh endpoint, one at a time
//! - Auth events broadcast to subscribers

use std::sync::Arc;
use std::time::Duration;

use mentorlink_domain::constants::{
    CONTENT_TYPE_JSON, DEFAULT_REFRESH_TOKEN_KEY, DEFAULT_TIMEOUT_MS, DEFAULT_TOKEN_KEY,
};
use mentorlink_domain::AuthSettings;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use super::store::{FileTokenStore, MemoryTokenStore, TokenStore};
use super::{AuthError, AuthResult};
use crate::api::{RequestBody, RequestConfig};
use crate::http::Transport;

const EVENT_CAPACITY: usize = 16;

/// Token lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A refresh stored a new access token
    TokensRefreshed,
    /// A refresh failed and all tokens were cleared; the user must log in
    /// again
    SessionExpired,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Owns the access/refresh token pair
pub struct TokenManager {
    session: Arc<dyn TokenStore>,
    durable: Arc<dyn TokenStore>,
    token_key: String,
    refresh_token_key: String,
    transport: Arc<dyn Transport>,
    refresh_url: String,
    timeout: Duration,
    refresh_lock: Mutex<()>,
    events: broadcast::Sender<AuthEvent>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_key", &self.token_key)
            .field("refresh_token_key", &self.refresh_token_key)
            .field("refresh_url", &self.refresh_url)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Start building a token manager
    ///
    /// # Arguments
    /// * `transport` - Used for refresh calls; they bypass the client pipeline
    /// * `refresh_url` - Absolute URL of the refresh endpoint
    pub fn builder(
        transport: Arc<dyn Transport>,
        refresh_url: impl Into<String>,
    ) -> TokenManagerBuilder {
        TokenManagerBuilder::new(transport, refresh_url.into())
    }

    /// Build from client settings
    ///
    /// The durable store is a [`FileTokenStore`] when `storage_path` is set
    /// and an in-memory store otherwise.
    pub fn from_settings(
        settings: &AuthSettings,
        transport: Arc<dyn Transport>,
        refresh_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let mut builder = Self::builder(transport, refresh_url)
            .token_key(&settings.token_key)
            .refresh_token_key(&settings.refresh_token_key)
            .timeout(timeout);
        if let Some(path) = &settings.storage_path {
            builder = builder.durable_store(Arc::new(FileTokenStore::new(path)));
        }
        builder.build()
    }

    /// Current access token
    pub fn get_token(&self) -> Option<String> {
        self.lookup(&self.token_key)
    }

    /// Current refresh token
    pub fn get_refresh_token(&self) -> Option<String> {
        self.lookup(&self.refresh_token_key)
    }

    /// Whether an access token is stored
    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some()
    }

    /// Store a token pair
    ///
    /// `remember` writes to the durable store and removes any copy from the
    /// session store; otherwise the reverse. A `None` refresh token leaves a
    /// previously stored one in place.
    pub fn set_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        remember: bool,
    ) -> AuthResult<()> {
        let (target, other) = if remember {
            (&self.durable, &self.session)
        } else {
            (&self.session, &self.durable)
        };

        target.set(&self.token_key, access_token)?;
        other.remove(&self.token_key)?;

        let refresh_token = match refresh_token {
            Some(token) => Some(token.to_string()),
            None => self.get_refresh_token(),
        };
        if let Some(token) = refresh_token {
            target.set(&self.refresh_token_key, &token)?;
            other.remove(&self.refresh_token_key)?;
        }

        debug!(remember, "tokens stored");
        Ok(())
    }

    /// Remove both tokens from both stores
    pub fn clear_tokens(&self) -> AuthResult<()> {
        for store in [&self.session, &self.durable] {
            store.remove(&self.token_key)?;
            store.remove(&self.refresh_token_key)?;
        }
        debug!("tokens cleared");
        Ok(())
    }

    /// Subscribe to [`AuthEvent`]s
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Refresh unconditionally and return the new access token
    ///
    /// # Errors
    /// `NoRefreshToken` when none is stored; `RefreshRejected`, `Transport`
    /// or `InvalidResponse` when the refresh call fails. Any failure clears
    /// the stored tokens and broadcasts [`AuthEvent::SessionExpired`].
    pub async fn refresh(&self) -> AuthResult<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh after the server rejected `rejected`
    ///
    /// Callers that queued behind an in-flight refresh find the rejected
    /// token already replaced and reuse the new one without a second
    /// refresh call.
    pub async fn refresh_after_rejection(&self, rejected: Option<&str>) -> AuthResult<String> {
        let _guard = self.refresh_lock.lock().await;

        match (self.get_token(), rejected) {
            (Some(current), Some(rejected)) if current != rejected => {
                debug!("token already refreshed by a concurrent caller");
                return Ok(current);
            }
            (None, Some(_)) => return Err(AuthError::SessionCleared),
            _ => {}
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> AuthResult<String> {
        match self.perform_refresh().await {
            Ok(token) => {
                info!("access token refreshed");
                let _ = self.events.send(AuthEvent::TokensRefreshed);
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, clearing session");
                if let Err(clear_err) = self.clear_tokens() {
                    warn!(error = %clear_err, "failed to clear tokens");
                }
                let _ = self.events.send(AuthEvent::SessionExpired);
                Err(err)
            }
        }
    }

    #[instrument(skip(self), fields(url = %self.refresh_url))]
    async fn perform_refresh(&self) -> AuthResult<String> {
        let refresh_token = self.get_refresh_token().ok_or(AuthError::NoRefreshToken)?;
        let remember = self.durable.get(&self.token_key)?.is_some()
            || self.durable.get(&self.refresh_token_key)?.is_some();

        let request = RequestConfig::post(&self.refresh_url)
            .header("content-type", CONTENT_TYPE_JSON)
            .header("accept", CONTENT_TYPE_JSON)
            .body(RequestBody::Json(json!({ "refresh_token": refresh_token })))
            .timeout(self.timeout);

        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status.is_success() {
            return Err(AuthError::RefreshRejected { status: response.status });
        }

        let parsed: RefreshResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        if parsed.access_token.is_empty() {
            return Err(AuthError::InvalidResponse("empty access_token".to_string()));
        }

        self.set_tokens(&parsed.access_token, parsed.refresh_token.as_deref(), remember)?;
        Ok(parsed.access_token)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        [&self.session, &self.durable].into_iter().find_map(|store| match store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "token store read failed");
                None
            }
        })
    }
}

/// Builder for [`TokenManager`]
pub struct TokenManagerBuilder {
    transport: Arc<dyn Transport>,
    refresh_url: String,
    token_key: String,
    refresh_token_key: String,
    session: Option<Arc<dyn TokenStore>>,
    durable: Option<Arc<dyn TokenStore>>,
    timeout: Duration,
}

impl TokenManagerBuilder {
    fn new(transport: Arc<dyn Transport>, refresh_url: String) -> Self {
        Self {
            transport,
            refresh_url,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            refresh_token_key: DEFAULT_REFRESH_TOKEN_KEY.to_string(),
            session: None,
            durable: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Storage key of the access token
    pub fn token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    /// Storage key of the refresh token
    pub fn refresh_token_key(mut self, key: impl Into<String>) -> Self {
        self.refresh_token_key = key.into();
        self
    }

    /// Store for tokens set without `remember`
    pub fn session_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.session = Some(store);
        self
    }

    /// Store for tokens set with `remember`
    pub fn durable_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.durable = Some(store);
        self
    }

    /// Timeout for the refresh call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the manager; stores default to memory
    pub fn build(self) -> TokenManager {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        TokenManager {
            session: self.session.unwrap_or_else(|| Arc::new(MemoryTokenStore::new())),
            durable: self.durable.unwrap_or_else(|| Arc::new(MemoryTokenStore::new())),
            token_key: self.token_key,
            refresh_token_key: self.refresh_token_key,
            transport: self.transport,
            refresh_url: self.refresh_url,
            timeout: self.timeout,
            refresh_lock: Mutex::new(()),
            events,
        }
    }
}
