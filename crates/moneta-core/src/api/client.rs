//! API client for communicating with the Moneta REST backend.
//!
//! Every call goes to the primary host first. If that host cannot be reached
//! at all (no HTTP response) and a fallback host is configured, the same
//! request is sent once more to the fallback host. HTTP error statuses and
//! timeouts are never retried.

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::config::ApiConfig;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Endpoints that never carry a bearer token, matched by prefix.
const PUBLIC_ENDPOINTS: [&str; 3] = ["/login", "/register", "/test"];

/// Pass as the body of a `post`/`put` that sends nothing.
pub const NO_BODY: Option<&()> = None;

/// Whether `endpoint` is reachable without authentication.
pub fn is_public_endpoint(endpoint: &str) -> bool {
    PUBLIC_ENDPOINTS
        .iter()
        .any(|public| endpoint.starts_with(public))
}

/// Which configured base URL a request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    Primary,
    Fallback,
}

/// One logical call, resent unchanged if it moves to the fallback host.
#[derive(Debug)]
struct RequestDescriptor {
    method: Method,
    endpoint: String,
    body: Option<Vec<u8>>,
    is_public: bool,
}

impl RequestDescriptor {
    fn new(method: Method, endpoint: &str, body: Option<Vec<u8>>) -> Self {
        let endpoint = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{}", endpoint)
        };
        let is_public = is_public_endpoint(&endpoint);
        Self {
            method,
            endpoint,
            body,
            is_public,
        }
    }

    fn url(&self, base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), self.endpoint)
    }
}

/// Failure before any HTTP response arrived.
enum SendError {
    Network(reqwest::Error),
    Timeout,
}

impl SendError {
    fn classify(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SendError::Timeout
        } else {
            SendError::Network(err)
        }
    }
}

impl From<SendError> for ApiError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::Network(e) => ApiError::Network(e),
            SendError::Timeout => ApiError::Timeout,
        }
    }
}

/// API client for the Moneta backend.
/// Clone is cheap - reqwest::Client and SessionStore are both shared handles.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    fallback_url: Option<String>,
    session: SessionStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("fallback_url", &self.fallback_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client reading its token from `session`.
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self> {
        Url::parse(&config.base_url)
            .with_context(|| format!("Invalid API base URL: {}", config.base_url))?;
        if let Some(ref fallback) = config.fallback_url {
            Url::parse(fallback)
                .with_context(|| format!("Invalid fallback API URL: {}", fallback))?;
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            fallback_url: config.fallback_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fallback_url(&self) -> Option<&str> {
        self.fallback_url.as_deref()
    }

    // ===== Verbs =====

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, None).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = Self::encode_body(body)?;
        self.request(Method::POST, endpoint, body).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = Self::encode_body(body)?;
        self.request(Method::PUT, endpoint, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, endpoint, None).await
    }

    // ===== Plumbing =====

    /// Serialize once so a fallback retry resends identical bytes.
    fn encode_body<B: Serialize + ?Sized>(body: Option<&B>) -> Result<Option<Vec<u8>>, ApiError> {
        body.map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))
    }

    /// Token for a protected call. A store that cannot be read counts as
    /// logged out; the server will answer 401 if the call needed one.
    fn cached_token(&self) -> Option<String> {
        match self.session.token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read cached token");
                None
            }
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, ApiError> {
        let req = RequestDescriptor::new(method, endpoint, body);
        let token = if req.is_public {
            None
        } else {
            self.cached_token()
        };

        let (host, response) = match self.send(&req, Host::Primary, token.as_deref()).await {
            Ok(response) => (Host::Primary, response),
            Err(SendError::Network(err)) => {
                if self.fallback_url.is_none() {
                    warn!(method = %req.method, endpoint = %req.endpoint, error = %err, "API network error");
                    return Err(ApiError::Network(err));
                }
                info!(
                    method = %req.method,
                    endpoint = %req.endpoint,
                    error = %err,
                    "Primary host unreachable, retrying on fallback host"
                );
                match self.send(&req, Host::Fallback, token.as_deref()).await {
                    Ok(response) => (Host::Fallback, response),
                    Err(err) => {
                        let err = ApiError::from(err);
                        warn!(method = %req.method, endpoint = %req.endpoint, error = %err, "Fallback host failed");
                        return Err(err);
                    }
                }
            }
            Err(SendError::Timeout) => {
                warn!(method = %req.method, endpoint = %req.endpoint, "API request timed out");
                return Err(ApiError::Timeout);
            }
        };

        self.handle_response(&req, host, response).await
    }

    async fn send(
        &self,
        req: &RequestDescriptor,
        host: Host,
        token: Option<&str>,
    ) -> Result<Response, SendError> {
        let base = match host {
            Host::Primary => self.base_url.as_str(),
            Host::Fallback => self.fallback_url.as_deref().unwrap_or(&self.base_url),
        };
        let url = req.url(base);
        debug!(
            method = %req.method,
            url = %url,
            ?host,
            public = req.is_public,
            authenticated = token.is_some(),
            "Sending API request"
        );

        let mut builder = self.client.request(req.method.clone(), &url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = req.body {
            builder = builder.body(body.clone());
        }

        builder.send().await.map_err(SendError::classify)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        req: &RequestDescriptor,
        host: Host,
        response: Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ApiError::from(SendError::classify(e)))?;
            // An empty 2xx body reads as JSON null, so `()` and `Option<_>` work.
            let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            return serde_json::from_slice(body).map_err(|e| ApiError::InvalidResponse {
                status: status.as_u16(),
                reason: format!("Failed to parse JSON response from {}: {}", req.endpoint, e),
            });
        }

        if status == StatusCode::UNAUTHORIZED && !req.is_public {
            warn!(endpoint = %req.endpoint, ?host, "Session expired, clearing cached session");
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "Failed to clear session after 401");
            }
            return Err(ApiError::SessionExpired);
        }

        // An unreadable error body degrades to an empty payload.
        let bytes = response.bytes().await.unwrap_or_default();
        let err = ApiError::from_status(status.as_u16(), &bytes);
        warn!(
            method = %req.method,
            endpoint = %req.endpoint,
            ?host,
            status = status.as_u16(),
            error = %err,
            "API error response"
        );
        Err(err)
    }
}
