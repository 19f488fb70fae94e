//! Core error types for `TubeGate`.

use thiserror::Error;

/// Core error type for `TubeGate` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tier name is neither primary nor fallback.
    #[error("Unknown tier: {0} (expected primary/pro or fallback/flash)")]
    UnknownTier(String),
}
