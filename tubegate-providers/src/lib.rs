// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `TubeGate` Providers
//!
//! HTTP clients behind the seams of `tubegate-fetch`:
//!
//! | Client | Implements | Service |
//! |--------|------------|---------|
//! | [`YouTubeClient`] | `ChannelDirectory` | YouTube Data API v3 |
//! | [`GeminiClient`] | `TierClient` | Gemini `generateContent` |
//!
//! Failed responses become a `CallError` carrying the status code and the
//! Google error status/reasons, so quota classification works the same for
//! both services.

pub mod error;
pub mod gemini;
pub mod youtube;

pub use error::ProviderError;
pub use gemini::GeminiClient;
pub use youtube::YouTubeClient;
