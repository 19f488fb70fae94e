//! YouTube Data API v3 channel directory.
//!
//! ## API Endpoints
//!
//! - `GET /youtube/v3/channels` - Lookup by `id`, `forHandle`, `forUsername` (1 unit)
//! - `GET /youtube/v3/search?type=channel` - Free-text search (100 units)
//!
//! The API key travels in the `key` query parameter.

mod api;

pub use api::{YOUTUBE_API_BASE, YouTubeClient, parse_channel_list, parse_search};
