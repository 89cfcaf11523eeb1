use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

/// Status reported for failures that never produced an HTTP response.
pub const NETWORK_ERROR_STATUS: u16 = 0;

/// Status reported when a request exceeded the configured timeout.
pub const TIMEOUT_STATUS: u16 = 408;

/// Status of an expired or rejected bearer token.
pub const UNAUTHORIZED_STATUS: u16 = 401;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Connection error - check your network and that the API is running")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out - check your connection")]
    Timeout,

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        data: Value,
    },

    #[error("Invalid response (status {status}): {reason}")]
    InvalidResponse { status: u16, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an [`ApiError::Http`] from a non-2xx response body.
    ///
    /// A JSON object body becomes the payload and its `message` field the
    /// error message. Anything else degrades to an empty object and a
    /// generic status message.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let data = match serde_json::from_slice::<Value>(body) {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                if !body.is_empty() {
                    debug!(
                        status,
                        body = %Self::truncate_body(&String::from_utf8_lossy(body)),
                        "Error body is not a JSON object"
                    );
                }
                Value::Object(Map::new())
            }
        };

        let message = data
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));

        ApiError::Http {
            status,
            message,
            data,
        }
    }

    /// Numeric status callers can branch on: the HTTP status, `0` for
    /// network failures, `408` for timeouts.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Network(_) | ApiError::InvalidRequest(_) => NETWORK_ERROR_STATUS,
            ApiError::Timeout => TIMEOUT_STATUS,
            ApiError::SessionExpired => UNAUTHORIZED_STATUS,
            ApiError::Http { status, .. } | ApiError::InvalidResponse { status, .. } => *status,
        }
    }

    /// Structured payload of the failure. Always a JSON object.
    pub fn data(&self) -> Value {
        match self {
            ApiError::Network(_) => json!({ "message": "Network error" }),
            ApiError::Timeout => json!({ "message": "Request timeout" }),
            ApiError::Http { data, .. } => data.clone(),
            other => json!({ "message": other.to_string() }),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout)
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}
