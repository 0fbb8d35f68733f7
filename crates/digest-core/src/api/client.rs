//! HTTP client with bearer auth and single-flight token refresh.
//!
//! Every request carries the stored access token. A 401 on anything except
//! the login and refresh endpoints starts (or joins) a refresh wave: the first
//! caller through the gate exchanges the refresh token, every other caller
//! that failed with the same stale token waits on the gate and then replays
//! with whatever token the wave produced. A failed refresh clears the session
//! and publishes [`SessionEvent::LoggedOut`]; waiters then find no token and
//! fail with [`ApiError::SessionExpired`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiResult};
use crate::config::Config;
use crate::credentials::{CredentialStore, mask_token};
use crate::models::TokenPair;

/// Standard User-Agent header for digest API requests.
pub const USER_AGENT: &str = concat!("digest/", env!("CARGO_PKG_VERSION"));

/// Token endpoint (login).
pub const LOGIN_PATH: &str = "/authorizer/token/";
/// Token refresh endpoint.
pub const REFRESH_PATH: &str = "/authorizer/token/refresh/";

const EVENT_CAPACITY: usize = 16;

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user logged out.
    Requested,
    /// A 401 arrived and no refresh token was stored.
    MissingRefreshToken,
    /// The refresh endpoint rejected the refresh token.
    RefreshFailed,
}

/// Session transitions published by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: Option<String> },
    Refreshed,
    LoggedOut { reason: LogoutReason },
}

/// A request description that can be sent more than once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Login and refresh answer 401 for bad credentials; those are final.
    fn is_auth_endpoint(&self) -> bool {
        self.path == LOGIN_PATH || self.path == REFRESH_PATH
    }
}

/// Client for the news service REST API.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
    refresh_gate: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Builds a client for `base_url` (path prefix included, e.g. `.../api`).
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<CredentialStore>,
    ) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            refresh_gate: Mutex::new(()),
            events,
        })
    }

    /// Builds a client from the loaded configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn from_config(config: &Config, credentials: Arc<CredentialStore>) -> anyhow::Result<Self> {
        let base_url = config.effective_base_url()?;
        Ok(Self::new(&base_url, config.timeout(), credentials)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Subscribes to session transitions (login, refresh, forced logout).
    ///
    /// Lets a caller notice a logout forced by a call whose error it swallowed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Sends a request and decodes the JSON body.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or a body
    /// that does not decode into `T`.
    pub async fn json<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApiResult<T> {
        let response = self.send(request).await?;
        let text = response.text().await?;
        let body = if text.trim().is_empty() { "null" } else { &text };
        Ok(serde_json::from_str(body)?)
    }

    /// Sends a request and discards the body.
    ///
    /// # Errors
    /// Returns an error on transport failure or non-success status.
    pub async fn empty(&self, request: &ApiRequest) -> ApiResult<()> {
        self.send(request).await?;
        Ok(())
    }

    /// Sends a request, recovering once from an expired access token.
    ///
    /// # Errors
    /// Returns an error on transport failure or non-success status, or
    /// [`ApiError::SessionExpired`] when the session could not be refreshed.
    pub async fn send(&self, request: &ApiRequest) -> ApiResult<reqwest::Response> {
        let token = self.credentials.access_token();
        let response = self.execute(request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || request.is_auth_endpoint() {
            return check_status(response).await;
        }

        debug!(path = %request.path, "401 received, joining refresh wave");
        let fresh = self.refresh_after(token.as_deref()).await?;
        let replayed = self.execute(request, Some(&fresh)).await?;
        check_status(replayed).await
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, %url, "request");

        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Returns a usable access token for a request that failed with `stale`.
    ///
    /// Exactly one refresh call is made per wave of requests that failed with
    /// the same token.
    async fn refresh_after(&self, stale: Option<&str>) -> ApiResult<String> {
        let _gate = self.refresh_gate.lock().await;

        match (self.credentials.access_token(), stale) {
            (Some(current), Some(stale)) if current != stale => return Ok(current),
            (Some(current), None) => return Ok(current),
            (None, Some(_)) => return Err(ApiError::SessionExpired),
            _ => {}
        }

        let Some(refresh) = self.credentials.refresh_token() else {
            warn!("No refresh token stored; ending session");
            self.force_logout(LogoutReason::MissingRefreshToken);
            return Err(ApiError::SessionExpired);
        };

        match self.request_refresh(&refresh).await {
            Ok(pair) => {
                info!(access = %mask_token(&pair.access), "Access token refreshed");
                self.credentials
                    .update_tokens(pair.access.clone(), pair.refresh)
                    .map_err(ApiError::Storage)?;
                self.publish(SessionEvent::Refreshed);
                Ok(pair.access)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed; ending session");
                self.force_logout(LogoutReason::RefreshFailed);
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn request_refresh(&self, refresh: &str) -> ApiResult<TokenPair> {
        let request = ApiRequest::post(REFRESH_PATH).json(serde_json::json!({ "refresh": refresh }));
        let response = check_status(self.execute(&request, None).await?).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Clears stored tokens and tells subscribers the session is over.
    pub(crate) fn force_logout(&self, reason: LogoutReason) {
        if let Err(err) = self.credentials.clear() {
            warn!(error = %format!("{err:#}"), "Failed to clear stored credentials");
        }
        self.publish(SessionEvent::LoggedOut { reason });
    }
}

async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        Err(ApiError::Unauthorized { body })
    } else {
        Err(ApiError::Http {
            status: status.as_u16(),
            body,
        })
    }
}
