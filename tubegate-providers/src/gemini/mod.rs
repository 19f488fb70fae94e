//! Gemini (Google) generative model client.
//!
//! Both model tiers are served by the same `generateContent` endpoint; the
//! orchestrator only swaps the model name.
//!
//! ## API Endpoints
//!
//! - `POST /v1beta/models/{model}:generateContent` - Text and image prompts
//!
//! The API key travels in the `x-goog-api-key` header.

mod api;

pub use api::{GEMINI_API_BASE, GeminiClient, parse_generate_response};
