//! Domain models for `TubeGate`.
//!
//! ## Submodules
//!
//! - [`usage`] - Counters, stats and health (UsageCounters, UsageStats, Health)
//! - [`credential`] - API keys held by a credential pool
//! - [`tier`] - Primary / fallback generative model tiers
//! - [`endpoint`] - External endpoints and their unit costs

mod credential;
pub mod endpoint;
mod tier;
pub mod usage;

// Re-export everything at the models level
pub use credential::{Credential, CredentialSource, key_hash};
pub use endpoint::{Endpoint, EndpointCatalog, EndpointCategory};
pub use tier::{ModelTier, TierBinding};
pub use usage::{ClassStats, DayUsage, Health, HealthStatus, UsageCounters, UsageStats};
