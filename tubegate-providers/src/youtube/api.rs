//! YouTube Data API client.
//!
//! Implements [`ChannelDirectory`] over `channels.list` and `search.list`.
//! Searches return the channel straight from the search snippet instead of
//! following up with a `channels.list` call, so a search costs exactly the
//! units the ledger charges for it.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use tubegate_core::CallError;
use tubegate_fetch::{Channel, ChannelDirectory, LookupKind};
use url::Url;

use crate::error::{ProviderError, status_error};

// ============================================================================
// Constants
// ============================================================================

/// YouTube Data API v3 base URL.
pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";

/// User agent for API requests.
const USER_AGENT_VALUE: &str = "TubeGate/0.1";

/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// API Response Types
// ============================================================================

/// `channels.list` response.
#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    /// Matching channels.
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

/// One channel resource.
#[derive(Debug, Deserialize)]
pub struct ChannelItem {
    /// Channel id.
    pub id: String,
    /// Snippet part.
    #[serde(default)]
    pub snippet: Option<ChannelSnippet>,
    /// Statistics part.
    #[serde(default)]
    pub statistics: Option<ChannelStatistics>,
}

/// Channel snippet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    /// Channel title.
    #[serde(default)]
    pub title: String,
    /// Channel description.
    #[serde(default)]
    pub description: Option<String>,
    /// Custom URL, usually the handle.
    #[serde(default)]
    pub custom_url: Option<String>,
    /// Thumbnails.
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
}

/// Channel statistics. Counts arrive as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    /// Subscriber count.
    #[serde(default)]
    pub subscriber_count: Option<String>,
    /// Video count.
    #[serde(default)]
    pub video_count: Option<String>,
    /// Whether the subscriber count is hidden.
    #[serde(default)]
    pub hidden_subscriber_count: bool,
}

/// Thumbnail set.
#[derive(Debug, Deserialize)]
pub struct Thumbnails {
    /// Default size.
    #[serde(default)]
    pub default: Option<Thumbnail>,
    /// Medium size.
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    /// High size.
    #[serde(default)]
    pub high: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(&self) -> Option<String> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

/// One thumbnail.
#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    /// Image URL.
    pub url: String,
}

/// `search.list` response.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// Search hits.
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One search hit.
#[derive(Debug, Deserialize)]
pub struct SearchItem {
    /// Resource id of the hit.
    pub id: SearchId,
    /// Snippet of the hit.
    #[serde(default)]
    pub snippet: Option<SearchSnippet>,
}

/// Resource id of a search hit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchId {
    /// Channel id, present for channel hits.
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Snippet of a search hit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    /// Channel id.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Thumbnails.
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
}

// ============================================================================
// Conversion
// ============================================================================

impl From<ChannelItem> for Channel {
    fn from(item: ChannelItem) -> Self {
        let mut channel = Channel::new(item.id, "");
        if let Some(snippet) = item.snippet {
            channel.title = snippet.title;
            channel.description = snippet.description.filter(|d| !d.is_empty());
            channel.handle = snippet.custom_url;
            channel.thumbnail_url = snippet.thumbnails.as_ref().and_then(Thumbnails::best);
        }
        if let Some(stats) = item.statistics {
            if !stats.hidden_subscriber_count {
                channel.subscriber_count = stats.subscriber_count.and_then(|s| s.parse().ok());
            }
            channel.video_count = stats.video_count.and_then(|s| s.parse().ok());
        }
        channel
    }
}

/// Takes the first channel of a `channels.list` body.
pub fn parse_channel_list(body: &str) -> Result<Option<Channel>, ProviderError> {
    let response: ChannelListResponse = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Failed to parse channels response");
        ProviderError::InvalidResponse(format!("JSON error: {e}"))
    })?;
    Ok(response.items.into_iter().next().map(Channel::from))
}

/// Takes the first channel hit of a `search.list` body.
pub fn parse_search(body: &str) -> Result<Option<Channel>, ProviderError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Failed to parse search response");
        ProviderError::InvalidResponse(format!("JSON error: {e}"))
    })?;

    Ok(response.items.into_iter().find_map(|item| {
        let snippet = item.snippet;
        let id = item
            .id
            .channel_id
            .or_else(|| snippet.as_ref().and_then(|s| s.channel_id.clone()))?;
        let mut channel = Channel::new(id, "");
        if let Some(snippet) = snippet {
            channel.title = snippet.title;
            channel.description = snippet.description.filter(|d| !d.is_empty());
            channel.thumbnail_url = snippet.thumbnails.as_ref().and_then(Thumbnails::best);
        }
        Some(channel)
    }))
}

// ============================================================================
// API Client
// ============================================================================

/// YouTube Data API client.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    base: Url,
}

impl YouTubeClient {
    /// Creates a client against the public API.
    pub fn new() -> Result<Self, ProviderError> {
        let base = Url::parse(YOUTUBE_API_BASE)
            .map_err(|e| ProviderError::ClientBuild(format!("Invalid base URL: {e}")))?;
        Self::with_base_url(base)
    }

    /// Creates a client against another base URL.
    pub fn with_base_url(base: Url) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self { http, base })
    }

    /// Builds the request URL for a lookup.
    pub fn lookup_url(&self, kind: LookupKind, api_key: &str, query: &str) -> Result<Url, ProviderError> {
        let resource = match kind {
            LookupKind::Search => "search",
            _ => "channels",
        };
        let mut url = self
            .base
            .join(resource)
            .map_err(|e| ProviderError::InvalidResponse(format!("Invalid URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            match kind {
                LookupKind::NativeId => {
                    pairs.append_pair("part", "snippet,statistics").append_pair("id", query);
                }
                LookupKind::Handle => {
                    pairs.append_pair("part", "snippet,statistics").append_pair("forHandle", query);
                }
                LookupKind::Username => {
                    pairs
                        .append_pair("part", "snippet,statistics")
                        .append_pair("forUsername", query);
                }
                LookupKind::Search => {
                    pairs
                        .append_pair("part", "snippet")
                        .append_pair("type", "channel")
                        .append_pair("maxResults", "1")
                        .append_pair("q", query);
                }
            }
            pairs.append_pair("key", api_key);
        }
        Ok(url)
    }

    #[instrument(skip(self, api_key))]
    async fn fetch(&self, kind: LookupKind, api_key: &str, query: &str) -> Result<Option<Channel>, ProviderError> {
        let url = self.lookup_url(kind, api_key, query)?;
        debug!(kind = %kind, "Calling YouTube Data API");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), kind = %kind, "YouTube lookup failed");
            return Err(status_error(status.as_u16(), &body));
        }

        match kind {
            LookupKind::Search => parse_search(&body),
            _ => parse_channel_list(&body),
        }
    }
}

#[async_trait]
impl ChannelDirectory for YouTubeClient {
    async fn lookup(&self, kind: LookupKind, api_key: &str, query: &str) -> Result<Option<Channel>, CallError> {
        self.fetch(kind, api_key, query).await.map_err(CallError::from)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_list() {
        let json = r#"{
            "kind": "youtube#channelListResponse",
            "items": [{
                "id": "UC_x5XG1OV2P6uZZ5FSM9Ttw",
                "snippet": {
                    "title": "Google for Developers",
                    "description": "",
                    "customUrl": "@googledevelopers",
                    "thumbnails": {
                        "default": {"url": "https://yt3.example/default.jpg"},
                        "high": {"url": "https://yt3.example/high.jpg"}
                    }
                },
                "statistics": {
                    "subscriberCount": "2450000",
                    "videoCount": "6100",
                    "hiddenSubscriberCount": false
                }
            }]
        }"#;

        let channel = parse_channel_list(json).unwrap().unwrap();
        assert_eq!(channel.id, "UC_x5XG1OV2P6uZZ5FSM9Ttw");
        assert_eq!(channel.title, "Google for Developers");
        assert_eq!(channel.handle.as_deref(), Some("@googledevelopers"));
        assert_eq!(channel.description, None);
        assert_eq!(channel.subscriber_count, Some(2_450_000));
        assert_eq!(channel.video_count, Some(6100));
        assert_eq!(channel.thumbnail_url.as_deref(), Some("https://yt3.example/high.jpg"));
    }

    #[test]
    fn test_parse_empty_channel_list_is_miss() {
        let json = r#"{"kind": "youtube#channelListResponse", "pageInfo": {"totalResults": 0}}"#;
        assert!(parse_channel_list(json).unwrap().is_none());
    }

    #[test]
    fn test_hidden_subscriber_count() {
        let json = r#"{"items": [{"id": "UC1", "statistics": {"subscriberCount": "100", "hiddenSubscriberCount": true}}]}"#;
        let channel = parse_channel_list(json).unwrap().unwrap();
        assert_eq!(channel.subscriber_count, None);
    }

    #[test]
    fn test_parse_search() {
        let json = r#"{
            "items": [{
                "id": {"kind": "youtube#channel", "channelId": "UCabc"},
                "snippet": {"channelId": "UCabc", "title": "Found", "description": "desc"}
            }]
        }"#;
        let channel = parse_search(json).unwrap().unwrap();
        assert_eq!(channel.id, "UCabc");
        assert_eq!(channel.title, "Found");
        assert_eq!(channel.description.as_deref(), Some("desc"));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(parse_search("not json"), Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_lookup_urls() {
        let client = YouTubeClient::new().unwrap();

        let url = client.lookup_url(LookupKind::Handle, "KEY", "GoogleDevelopers").unwrap();
        assert_eq!(url.path(), "/youtube/v3/channels");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("forHandle".into(), "GoogleDevelopers".into())));
        assert!(query.contains(&("key".into(), "KEY".into())));

        let url = client.lookup_url(LookupKind::Search, "KEY", "google devs").unwrap();
        assert_eq!(url.path(), "/youtube/v3/search");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("type".into(), "channel".into())));
        assert!(query.contains(&("q".into(), "google devs".into())));
    }
}
