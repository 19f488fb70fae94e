// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `TubeGate` Fetch
//!
//! Decides which credential, which model tier, and which lookup to spend
//! quota on.
//!
//! ## Credential Pool
//!
//! - [`pool::CredentialPool`] - First-fit key selection with per-key ledger
//!   partitions; quota errors park a key until the day rolls over
//!
//! ## Model Fallback
//!
//! - [`fallback::TierClient`] - Trait for the generative service
//! - [`fallback::ModelFallbackOrchestrator`] - Primary tier, then fallback on
//!   quota errors only
//!
//! ## Channel Resolution
//!
//! - [`resolver::ResolveStrategy`] - Trait for one way of finding a channel
//! - [`resolver::ChannelDirectory`] - Trait for the directory service
//! - [`resolver::CostOrderedResolver`] - Runs strategies cheapest first
//!
//! ## Example
//!
//! ```ignore
//! use tubegate_fetch::{CostOrderedResolver, CredentialPool, PoolConfig};
//!
//! let pool = Arc::new(CredentialPool::open(PoolConfig::youtube(&config), clock).await);
//! let resolver = CostOrderedResolver::with_directory(pool, Arc::new(youtube_client));
//!
//! let outcome = resolver.resolve("@GoogleDevelopers").await;
//! println!("spent {} units", outcome.units_spent());
//! ```

pub mod error;
pub mod fallback;
pub mod pool;
pub mod resolver;

// Errors
pub use error::FetchError;

// Credential pool
pub use pool::{
    AddOutcome, CredentialPool, CredentialUsage, NewCredential, PoolConfig, PoolStats,
    is_valid_key_format,
};

// Model fallback
pub use fallback::{
    DebugInfo, GenerationRequest, InlineImage, ModelFallbackOrchestrator, OrchestratorConfig,
    OrchestratorHealth, OrchestratorUpdate, Recommendation, TierClient, TierResponse,
};

// Channel resolution
pub use resolver::{
    AttemptStatus, Channel, ChannelDirectory, CostOrderedResolver, DirectoryStrategy, LookupKind,
    ResolveAttempt, ResolveOutcome, ResolveStrategy, ResolvedChannel, is_native_id,
    normalize_identifier,
};
