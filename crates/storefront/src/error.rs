//! Request error type shared by the resource client and the query cache.
//!
//! `ClientError` is plain data (`Clone + PartialEq`) so the query cache can
//! store it on an entry and hand the same failure to every waiting caller.

use thiserror::Error;

/// Maximum number of characters of a response body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors produced by a backend request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Transport-level failure (unreachable host, timeout, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, unserializable body, bad header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Build an HTTP error from a status and raw body.
    ///
    /// Uses the JSON `message` field when present, otherwise the first
    /// characters of the body, otherwise the status reason.
    #[must_use]
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect());

        let message = if message.is_empty() {
            status.canonical_reason().unwrap_or("Unknown status").to_string()
        } else {
            message
        };

        Self::Http {
            status: status.as_u16(),
            message,
        }
    }

    /// HTTP status code, if the backend responded.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 404 responses.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// True for 401 and 403 responses.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401 | 403, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
