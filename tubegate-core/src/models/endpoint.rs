//! External API endpoints and what each call costs.
//!
//! The YouTube Data API charges different unit costs per method: a
//! `channels.list` lookup costs 1 unit while `search.list` costs 100. The
//! catalog maps each endpoint name to its cost and to the ledger resource
//! class the cost is charged against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Endpoint
// ============================================================================

/// Which service an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointCategory {
    /// Gemini generative models.
    Gemini,
    /// YouTube Data API v3.
    YouTube,
    /// Anything registered at runtime.
    Custom,
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gemini => "gemini",
            Self::YouTube => "youtube",
            Self::Custom => "custom",
        };
        write!(f, "{name}")
    }
}

/// Cost entry for one external endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Endpoint name, e.g. `youtube-search`.
    pub name: String,
    /// Units charged per successful call.
    pub cost: u64,
    /// Disabled endpoints are never charged.
    pub enabled: bool,
    /// Ledger resource class the cost is charged to.
    pub resource_class: String,
    /// Owning service.
    pub category: EndpointCategory,
}

impl Endpoint {
    /// Creates an enabled endpoint.
    pub fn new(
        name: impl Into<String>,
        cost: u64,
        resource_class: impl Into<String>,
        category: EndpointCategory,
    ) -> Self {
        Self {
            name: name.into(),
            cost,
            enabled: true,
            resource_class: resource_class.into(),
            category,
        }
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ============================================================================
// Endpoint Catalog
// ============================================================================

/// Well-known endpoint names.
pub mod names {
    /// `videos.list`
    pub const YOUTUBE_VIDEOS: &str = "youtube-videos";
    /// `search.list`
    pub const YOUTUBE_SEARCH: &str = "youtube-search";
    /// `channels.list`
    pub const YOUTUBE_CHANNELS: &str = "youtube-channels";
    /// `commentThreads.list`
    pub const YOUTUBE_COMMENTS: &str = "youtube-comments";
    /// `playlistItems.list`
    pub const YOUTUBE_PLAYLISTS: &str = "youtube-playlists";
    /// `captions.download`
    pub const YOUTUBE_CAPTIONS: &str = "youtube-captions";
}

/// Endpoint name → cost entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCatalog {
    endpoints: BTreeMap<String, Endpoint>,
}

impl EndpointCatalog {
    /// Creates an empty catalog.
    pub fn empty() -> Self {
        Self {
            endpoints: BTreeMap::new(),
        }
    }

    /// YouTube Data API endpoints charged to `resource_class`.
    pub fn youtube(resource_class: &str) -> Self {
        let mut catalog = Self::empty();
        let yt = |name: &str, cost| Endpoint::new(name, cost, resource_class, EndpointCategory::YouTube);
        catalog.insert(yt(names::YOUTUBE_VIDEOS, 1));
        catalog.insert(yt(names::YOUTUBE_SEARCH, 100));
        catalog.insert(yt(names::YOUTUBE_CHANNELS, 1));
        catalog.insert(yt(names::YOUTUBE_COMMENTS, 1));
        catalog.insert(yt(names::YOUTUBE_PLAYLISTS, 1).disabled());
        catalog.insert(yt(names::YOUTUBE_CAPTIONS, 200).disabled());
        catalog
    }

    /// Gemini model endpoints, one unit per call, each charged to its own class.
    pub fn gemini<'a>(models: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut catalog = Self::empty();
        for (model, class) in models {
            catalog.insert(Endpoint::new(model, 1, class, EndpointCategory::Gemini));
        }
        catalog
    }

    /// Adds or replaces an endpoint.
    pub fn insert(&mut self, endpoint: Endpoint) {
        self.endpoints.insert(endpoint.name.clone(), endpoint);
    }

    /// Looks up an endpoint.
    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    /// Enables or disables an endpoint. Returns false if it is unknown.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.endpoints.get_mut(name) {
            Some(endpoint) => {
                endpoint.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Changes an endpoint's cost. Returns the previous cost if it exists.
    pub fn set_cost(&mut self, name: &str, cost: u64) -> Option<u64> {
        self.endpoints
            .get_mut(name)
            .map(|endpoint| std::mem::replace(&mut endpoint.cost, cost))
    }

    /// All endpoints of one category.
    pub fn by_category(&self, category: EndpointCategory) -> Vec<&Endpoint> {
        self.endpoints
            .values()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Iterates all endpoints in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    /// Merges another catalog into this one.
    pub fn extend(&mut self, other: EndpointCatalog) {
        self.endpoints.extend(other.endpoints);
    }
}

impl Default for EndpointCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_costs() {
        let catalog = EndpointCatalog::youtube("youtube-data-api");
        assert_eq!(catalog.get(names::YOUTUBE_SEARCH).unwrap().cost, 100);
        assert_eq!(catalog.get(names::YOUTUBE_CHANNELS).unwrap().cost, 1);
        assert!(!catalog.get(names::YOUTUBE_CAPTIONS).unwrap().enabled);
        assert_eq!(catalog.by_category(EndpointCategory::YouTube).len(), 6);
    }

    #[test]
    fn test_set_cost_and_enable() {
        let mut catalog = EndpointCatalog::youtube("yt");
        assert_eq!(catalog.set_cost(names::YOUTUBE_VIDEOS, 3), Some(1));
        assert!(catalog.set_enabled(names::YOUTUBE_CAPTIONS, true));
        assert!(!catalog.set_enabled("nope", true));
        assert_eq!(catalog.set_cost("nope", 3), None);
    }

    #[test]
    fn test_gemini_catalog() {
        let catalog = EndpointCatalog::gemini([("gemini-2.5-pro", "pro"), ("gemini-2.5-flash", "flash")]);
        assert_eq!(catalog.get("gemini-2.5-pro").unwrap().resource_class, "pro");
        assert!(catalog.get("gemini-2.5-flash-lite").is_none());
    }
}
