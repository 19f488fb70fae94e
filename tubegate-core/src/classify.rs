//! Failure classification.
//!
//! External services report quota exhaustion in several shapes: an HTTP 429,
//! a `RESOURCE_EXHAUSTED` status in a JSON body, or a 403 whose reason is
//! `quotaExceeded`. All of that sniffing lives in [`classify_error`] so the
//! rest of the workspace only ever matches on [`ErrorKind`].

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Classification Tables
// ============================================================================

/// Message fragments that mark a failure as quota exhaustion.
///
/// Matched case-insensitively against the error message.
pub const QUOTA_ERROR_PATTERNS: &[&str] = &[
    "resource exhausted",
    "quota exceeded",
    "rate limit exceeded",
    "user quota exhausted",
    "too many requests",
    "resource_exhausted",
    "rate_limit_exceeded",
    "quotaexceeded",
    "dailylimitexceeded",
];

/// Status codes that mark a failure as quota exhaustion.
const QUOTA_STATUS_CODES: &[u16] = &[429];

// ============================================================================
// Call Error
// ============================================================================

/// A failure reported by an outbound call to an external service.
///
/// Carries only what classification needs: the message and, when the
/// failure came from an HTTP response, its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    /// Human-readable failure message (often the upstream error body).
    pub message: String,
    /// HTTP status code, if the failure came from a response.
    pub status: Option<u16>,
}

impl CallError {
    /// Creates an error without a status code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Creates an error carrying an HTTP status code.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Creates a timeout error.
    pub fn timeout() -> Self {
        Self::new("request timed out")
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        classify_error(self)
    }

    /// Returns true if this error is quota exhaustion.
    pub fn is_quota(&self) -> bool {
        self.kind() == ErrorKind::QuotaExceeded
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CallError {}

// ============================================================================
// Error Kind
// ============================================================================

/// The error taxonomy of the quota core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The call was refused because an allotted budget is spent.
    QuotaExceeded,
    /// Every credential in a pool is exhausted or inactive.
    NoCredentialAvailable,
    /// Any other failure of the underlying call.
    TransientCallFailure,
    /// Ledger or credential file I/O failed.
    PersistenceFailure,
    /// The requested channel or credential does not exist.
    NotFound,
    /// A key or identifier supplied by the caller is malformed.
    InvalidInput,
    /// Configuration values are out of range or unknown.
    InvalidConfig,
}

impl ErrorKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota_exceeded",
            Self::NoCredentialAvailable => "no_credential_available",
            Self::TransientCallFailure => "transient_call_failure",
            Self::PersistenceFailure => "persistence_failure",
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::InvalidConfig => "invalid_config",
        }
    }

    /// Returns a user-facing suggestion for this kind.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "Daily quota exhausted; try again after the quota resets",
            Self::NoCredentialAvailable => {
                "All API keys are exhausted or inactive; add a key or try again later"
            }
            Self::TransientCallFailure => {
                "The upstream service failed; check the request and try again"
            }
            Self::PersistenceFailure => {
                "Usage data could not be saved; check the data directory permissions"
            }
            Self::NotFound => "Nothing matched; check the identifier or list what exists",
            Self::InvalidInput => "The input is malformed; correct it and try again",
            Self::InvalidConfig => "Fix the configuration file or TUBEGATE_* variables",
        }
    }

    /// Returns true if waiting may make the same request succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QuotaExceeded | Self::NoCredentialAvailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifies an externally-reported failure.
///
/// Returns [`ErrorKind::QuotaExceeded`] when the status code is one of the
/// quota codes (429) or the message contains any of
/// [`QUOTA_ERROR_PATTERNS`], and [`ErrorKind::TransientCallFailure`]
/// otherwise.
pub fn classify_error(err: &CallError) -> ErrorKind {
    if err
        .status
        .is_some_and(|status| QUOTA_STATUS_CODES.contains(&status))
    {
        return ErrorKind::QuotaExceeded;
    }

    let message = err.message.to_lowercase();
    if QUOTA_ERROR_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
    {
        ErrorKind::QuotaExceeded
    } else {
        ErrorKind::TransientCallFailure
    }
}

// ============================================================================
// Error Report
// ============================================================================

/// Structured error handed to the dashboard layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error kind.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
    /// What the user can do about it.
    pub suggestion: String,
}

impl ErrorReport {
    /// Builds a report for the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestion: kind.suggestion().to_string(),
        }
    }
}

impl From<&CallError> for ErrorReport {
    fn from(err: &CallError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
