//! Admin API client
//!
//! Every call goes through [`ApiClient::send`], which attaches the stored access
//! token and handles failures:
//!
//! - no response: [`ClientError::Network`], never retried;
//! - 5xx: [`ClientError::ServerError`], never retried;
//! - 401 on a request that has not been retried yet: the session is refreshed
//!   once (see [`refresh`]) and the request is replayed with the new token;
//! - anything else is handed back as-is.

pub mod articles;
pub mod auth;
pub mod error;
pub mod refresh;
pub mod users;

use dashboard_core::{LOGIN_PATH, Navigator, SessionStore};
use error::ClientError;
use refresh::{RefreshCoordinator, RefreshLease, Ticket};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::RefreshResponse;

/// Path of the token refresh endpoint
pub const REFRESH_PATH: &str = "/refresh";

/// Request timeout applied to every call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A request as the caller described it, kept so it can be replayed after a
/// token refresh
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<JsonValue>,
    query: Vec<(String, String)>,
    retried: bool,
}

impl ApiRequest {
    /// Create a request for `path`, relative to the client's base URL
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach query parameters from any struct or map; `null` fields are skipped
    pub fn query<T: Serialize + ?Sized>(mut self, params: &T) -> Result<Self, ClientError> {
        match serde_json::to_value(params)? {
            JsonValue::Object(map) => {
                for (key, value) in map {
                    match value {
                        JsonValue::Null => {}
                        JsonValue::String(s) => self.query.push((key, s)),
                        other => self.query.push((key, other.to_string())),
                    }
                }
                Ok(self)
            }
            JsonValue::Null => Ok(self),
            other => Err(ClientError::Serialization(format!(
                "query parameters must be an object, got {other}"
            ))),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Whether this request is a replay after a refresh
    pub fn is_retry(&self) -> bool {
        self.retried
    }

    fn targets_refresh(&self) -> bool {
        let path = self.path.split('?').next().unwrap_or_default();
        path.trim_end_matches('/') == REFRESH_PATH
    }
}

/// Admin API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    refresh: Arc<RefreshCoordinator>,
    // Bumped every time the stored session is cleared
    session_endings: Arc<AtomicU64>,
}

impl ApiClient {
    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session store the client reads tokens from
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Refresh coordinator shared by all clones of this client
    pub fn refresh_state(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// Send a request, refreshing the session once on a 401
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ClientError> {
        let mut request = request;
        let mut token_override = None;

        loop {
            let response = self.dispatch(&request, token_override.take()).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let message = error_message(response).await;

            if status.is_server_error() {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    status = status.as_u16(),
                    "Server error"
                );
                return Err(ClientError::ServerError {
                    status: status.as_u16(),
                    message,
                });
            }

            if status != StatusCode::UNAUTHORIZED || request.retried {
                return Err(ClientError::from_status(status, message));
            }

            let token = self.recover_session(&request, message).await?;
            request.retried = true;
            token_override = Some(token);
        }
    }

    /// Send a request and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Clear the stored session and send the user to the login page
    pub fn end_session(&self) {
        self.clear_session();
        self.redirect_to_login();
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<String>,
    ) -> Result<Response, ClientError> {
        let token = match token {
            Some(token) => Some(token),
            None => self.session.access_token()?,
        };

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        debug!(
            method = %request.method,
            path = %request.path,
            retry = request.retried,
            "Dispatching request"
        );

        builder.send().await.map_err(|e| {
            let err = ClientError::from(e);
            if matches!(err, ClientError::Network(_)) {
                warn!(method = %request.method, path = %request.path, "Network error: {err}");
            }
            err
        })
    }

    /// Obtain a fresh access token after `request` was rejected with 401
    async fn recover_session(
        &self,
        request: &ApiRequest,
        message: String,
    ) -> Result<String, ClientError> {
        if request.targets_refresh() {
            warn!("Refresh call was rejected, ending session");
            self.end_session();
            return Err(ClientError::SessionExpired(message));
        }

        match self.refresh.begin_refresh() {
            Ticket::Waiter(waiter) => {
                debug!(path = %request.path, "Waiting for in-flight token refresh");
                waiter.wait().await
            }
            Ticket::Leader(lease) => self.lead_refresh(lease, message).await,
        }
    }

    /// Run the refresh as leader. `message` is the 401 body that triggered it,
    /// returned as-is when there is no refresh token to try.
    async fn lead_refresh(
        &self,
        lease: RefreshLease<'_>,
        message: String,
    ) -> Result<String, ClientError> {
        let outcome = match self.session.refresh_token() {
            Ok(Some(refresh_token)) => {
                info!("Access token rejected, refreshing session");
                self.exchange_refresh_token(&refresh_token).await
            }
            Ok(None) => {
                debug!("No refresh token stored");
                Err(ClientError::AuthenticationFailed(message))
            }
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(access_token) => {
                lease.settle(&Ok(access_token.clone()));
                info!("Session refreshed");
                Ok(access_token)
            }
            Err(err) => {
                warn!(kind = %err.kind(), "Token refresh failed: {err}");
                self.clear_session();
                lease.settle(&Err(err.clone()));
                self.redirect_to_login();
                Err(err)
            }
        }
    }

    /// Trade the refresh token for a new access token, outside the 401 handling
    /// of [`send`](Self::send), and persist what the server issued
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .header(header::AUTHORIZATION, format!("Bearer {refresh_token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ClientError::from_status(status, message));
        }

        let tokens: RefreshResponse = response.json().await?;
        self.session
            .store_tokens(&tokens.access_token, tokens.refresh_token.as_deref())?;
        Ok(tokens.access_token)
    }

    /// Number of times the session has been cleared by this client or its clones
    pub(crate) fn session_endings(&self) -> u64 {
        self.session_endings.load(Ordering::SeqCst)
    }

    fn clear_session(&self) {
        self.session_endings.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.session.clear() {
            warn!("Failed to clear session: {e}");
        }
    }

    fn redirect_to_login(&self) {
        info!("Redirecting to {LOGIN_PATH}");
        if let Err(e) = self.navigator.navigate(LOGIN_PATH) {
            warn!("Failed to navigate to {LOGIN_PATH}: {e}");
        }
    }
}

/// Best human-readable message from an error response: the JSON `message`
/// field, else the body, else the status text
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<JsonValue>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(JsonValue::as_str).map(str::to_string))
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.to_string())
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    session: Option<Arc<dyn SessionStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set where session tokens are read from and written to
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session = Some(store);
        self
    }

    /// Set what moves the application to the login page
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let session = self
            .session
            .ok_or_else(|| ClientError::Configuration("session store is required".into()))?;
        let navigator = self
            .navigator
            .ok_or_else(|| ClientError::Configuration("navigator is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url}: {e}")))?;

        let client = ClientBuilder::new()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| concat!("dashboard-client/", env!("CARGO_PKG_VERSION")).to_string()),
            )
            .build()?;

        Ok(ApiClient {
            client,
            base_url,
            session,
            navigator,
            refresh: Arc::new(RefreshCoordinator::new()),
            session_endings: Arc::new(AtomicU64::new(0)),
        })
    }
}
