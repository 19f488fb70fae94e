//! Provider errors.

use serde::Deserialize;
use thiserror::Error;
use tubegate_core::CallError;

/// Errors raised by the HTTP clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the body.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Failed to build the HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::HttpError(format!("Connection failed: {err}"))
        } else {
            ProviderError::HttpError(err.to_string())
        }
    }
}

impl From<ProviderError> for CallError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout => CallError::timeout(),
            ProviderError::Status { status, message } => CallError::with_status(status, message),
            other => CallError::new(other.to_string()),
        }
    }
}

// ============================================================================
// Google Error Envelope
// ============================================================================

/// `{"error": {...}}` body returned by Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

/// Builds a [`ProviderError::Status`] from a failed response body.
///
/// The message keeps the Google status (`RESOURCE_EXHAUSTED`) and the error
/// reasons (`quotaExceeded`) so quota classification can see them.
pub(crate) fn status_error(status: u16, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let err = envelope.error;
            let mut parts: Vec<String> = Vec::new();
            if let Some(message) = err.message {
                parts.push(message);
            }
            if let Some(status) = err.status {
                parts.push(status);
            }
            let reasons: Vec<String> = err.errors.into_iter().filter_map(|e| e.reason).collect();
            if !reasons.is_empty() {
                parts.push(format!("reason: {}", reasons.join(", ")));
            }
            if parts.is_empty() {
                body.to_string()
            } else {
                parts.join(" | ")
            }
        }
        Err(_) => body.trim().to_string(),
    };
    ProviderError::Status { status, message }
}
