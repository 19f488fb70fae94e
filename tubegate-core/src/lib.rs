// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `TubeGate` Core
//!
//! Core types, error taxonomy, and configuration for the `TubeGate`
//! quota governor.
//!
//! This crate provides the foundational abstractions used across all other
//! `TubeGate` crates, including:
//!
//! - Domain models (resource classes, usage counters, credentials, tiers)
//! - The error taxonomy and the single quota-error classifier
//! - Environment-style configuration
//! - The [`Clock`] seam used to make day-boundary logic testable
//!
//! ## Key Types
//!
//! ### Usage Types
//! - [`UsageCounters`] - `used`/`errors` for one resource class on one day
//! - [`UsageStats`] - Consolidated snapshot polled by dashboards
//! - [`Health`] - Healthy / degraded / exhausted report
//!
//! ### Credentials & Tiers
//! - [`Credential`] - One API key held by a credential pool
//! - [`ModelTier`] - Primary or fallback generative model tier
//! - [`EndpointCatalog`] - Cost table for external API endpoints
//!
//! ### Errors
//! - [`CallError`] - A failure reported by an external call
//! - [`ErrorKind`] - Classification result of [`classify_error`]
//! - [`ErrorReport`] - Structured error with a user-facing suggestion

pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use classify::{CallError, ErrorKind, ErrorReport, QUOTA_ERROR_PATTERNS, classify_error};
pub use error::CoreError;

// Re-export configuration
pub use config::{DayBoundary, GovernorConfig, YOUTUBE_RESOURCE_CLASS};

// Re-export all model types
pub use models::{
    // Usage types
    ClassStats,
    DayUsage,
    Health,
    HealthStatus,
    UsageCounters,
    UsageStats,
    // Credentials
    Credential,
    CredentialSource,
    key_hash,
    // Tiers
    ModelTier,
    TierBinding,
    // Endpoints
    Endpoint,
    EndpointCatalog,
    EndpointCategory,
};

// Re-export traits
pub use traits::{Clock, ManualClock, SystemClock};
