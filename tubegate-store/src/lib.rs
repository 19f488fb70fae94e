// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `TubeGate` Store
//!
//! Daily usage accounting for the `TubeGate` quota governor.
//!
//! This crate provides:
//!
//! - **UsageLedger**: per-resource-class counters for "today", budgets,
//!   recommendations and health
//! - **Day strings**: which quota day an instant belongs to
//! - **Persistence**: atomic JSON file I/O
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tubegate_core::{GovernorConfig, SystemClock};
//! use tubegate_store::{LedgerConfig, UsageLedger};
//!
//! let config = GovernorConfig::from_env()?;
//! let ledger = UsageLedger::open(LedgerConfig::for_models(&config), Arc::new(SystemClock)).await;
//!
//! if let Some(class) = ledger.recommend().await {
//!     // call the model bound to `class`, then
//!     ledger.increment(&class, true).await;
//! }
//! ```

pub mod day;
pub mod error;
pub mod ledger;
pub mod persistence;

pub use day::{day_date, day_string};
pub use error::StoreError;
pub use ledger::{LedgerConfig, LedgerHistory, UsageLedger};
pub use persistence::{ensure_dir, load_json, load_json_if_exists, load_json_or_default, save_json};
