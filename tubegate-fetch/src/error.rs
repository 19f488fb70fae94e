//! Fetch error types.

use thiserror::Error;
use tubegate_core::{CallError, CoreError, ErrorKind, ErrorReport};
use tubegate_store::StoreError;

/// Error type for pool, orchestrator and resolver operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every credential is inactive or over budget for the class.
    #[error("No credential available for {class}")]
    NoCredentialAvailable {
        /// Resource class that was requested.
        class: String,
    },

    /// The key does not look like a valid API key.
    #[error("Invalid API key format: {0}")]
    InvalidCredential(String),

    /// No credential with this id.
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    /// Every resolution strategy missed.
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// The identifier is empty after normalisation.
    #[error("Invalid channel identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The external call failed.
    #[error(transparent)]
    Call(#[from] CallError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl FetchError {
    /// Maps this error onto the quota taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCredentialAvailable { .. } => ErrorKind::NoCredentialAvailable,
            Self::Call(err) => err.kind(),
            Self::Store(_) => ErrorKind::PersistenceFailure,
            Self::ChannelNotFound(_) | Self::CredentialNotFound(_) => ErrorKind::NotFound,
            Self::InvalidCredential(_) | Self::InvalidIdentifier(_) => ErrorKind::InvalidInput,
            Self::Core(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Returns true if this is a quota error from the external service.
    pub fn is_quota(&self) -> bool {
        self.kind() == ErrorKind::QuotaExceeded
    }

    /// Builds the structured report shown to users.
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.kind(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = FetchError::NoCredentialAvailable {
            class: "youtube-data-api".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NoCredentialAvailable);
        assert!(err.kind().is_retryable());

        let err = FetchError::from(CallError::with_status(429, "slow down"));
        assert!(err.is_quota());

        let err = FetchError::ChannelNotFound("@nobody".to_string());
        assert_eq!(err.report().kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_caller_errors_get_their_own_suggestion() {
        let upstream = ErrorKind::TransientCallFailure.suggestion();
        let cases = [
            (FetchError::ChannelNotFound("@nobody".to_string()), ErrorKind::NotFound),
            (FetchError::CredentialNotFound("key-0000".to_string()), ErrorKind::NotFound),
            (FetchError::InvalidCredential("AIzaShort".to_string()), ErrorKind::InvalidInput),
            (FetchError::InvalidIdentifier(String::new()), ErrorKind::InvalidInput),
            (
                FetchError::Core(CoreError::UnknownTier("turbo".to_string())),
                ErrorKind::InvalidConfig,
            ),
        ];
        for (err, kind) in cases {
            let report = err.report();
            assert_eq!(report.kind, kind, "{err}");
            assert_ne!(report.suggestion, upstream, "{err}");
        }

        let err = FetchError::from(CallError::with_status(500, "backend error"));
        assert_eq!(err.kind(), ErrorKind::TransientCallFailure);
    }
}
