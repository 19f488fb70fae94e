//! Cost-ordered channel resolution.
//!
//! A channel can be named by its native id (`UC…`), a handle (`@name`), a
//! legacy username, or free text. Lookups by id, handle and username each
//! cost one quota unit; a search costs a hundred. The resolver tries the
//! cheapest applicable strategy first and stops at the first hit, so the
//! expensive search only runs when every cheap lookup missed.
//!
//! Each lookup borrows a key from the [`CredentialPool`] and reports back to
//! it, so costs land in the right key's partition and quota errors park the
//! key. After a quota error the same strategy runs again on the next key, so
//! a spent key never pushes the chain on to a pricier lookup. Once no key is
//! left the resolver returns [`FetchError::NoCredentialAvailable`]. Any other
//! call failure aborts the chain; only a clean miss moves on.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use tubegate_core::models::endpoint::names;
use tubegate_core::{CallError, Credential};
use url::Url;

use crate::error::FetchError;
use crate::pool::CredentialPool;

/// Shape of a native channel id.
static CHANNEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^UC[A-Za-z0-9_-]{22}$").expect("Invalid regex"));

/// Returns true if `identifier` is a native channel id.
pub fn is_native_id(identifier: &str) -> bool {
    CHANNEL_ID_RE.is_match(identifier)
}

/// Reduces user input to a bare identifier.
///
/// Whitespace is trimmed and channel URLs are reduced to the part that names
/// the channel: `/channel/UC…` → `UC…`, `/@name` → `@name`, `/user/name` and
/// `/c/name` → `name`.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if lower.starts_with("youtube.com/")
        || lower.starts_with("www.youtube.com/")
        || lower.starts_with("m.youtube.com/")
    {
        format!("https://{trimmed}")
    } else {
        return trimmed.to_string();
    };

    let Ok(url) = Url::parse(&candidate) else {
        return trimmed.to_string();
    };
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["channel" | "user" | "c", name, ..] => (*name).to_string(),
        [first, ..] if first.starts_with('@') => (*first).to_string(),
        [.., last] => (*last).to_string(),
        [] => trimmed.to_string(),
    }
}

// ============================================================================
// Channel & Lookup Kind
// ============================================================================

/// A resolved channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Native channel id.
    pub id: String,
    /// Channel title.
    pub title: String,
    /// Custom URL / handle, if the channel has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    /// Channel description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Public subscriber count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<u64>,
    /// Public video count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_count: Option<u64>,
    /// Default thumbnail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl Channel {
    /// A channel with only an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            handle: None,
            description: None,
            subscriber_count: None,
            video_count: None,
            thumbnail_url: None,
        }
    }
}

/// The four ways of finding a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupKind {
    /// `channels.list?id=`
    NativeId,
    /// `channels.list?forHandle=`
    Handle,
    /// `channels.list?forUsername=`
    Username,
    /// `search.list?type=channel`
    Search,
}

impl LookupKind {
    /// All kinds, cheapest first.
    pub fn all() -> [LookupKind; 4] {
        [Self::NativeId, Self::Handle, Self::Username, Self::Search]
    }

    /// Strategy id.
    pub fn id(&self) -> &'static str {
        match self {
            Self::NativeId => "native-id",
            Self::Handle => "handle",
            Self::Username => "username",
            Self::Search => "search",
        }
    }

    /// Position in the cost order.
    ///
    /// The native id lookup sorts first because it is the only one tried
    /// when it applies; it is still charged as a `channels.list` call.
    pub fn cost(&self) -> u64 {
        match self {
            Self::NativeId => 0,
            Self::Handle | Self::Username => 1,
            Self::Search => 100,
        }
    }

    /// Catalog endpoint charged for the call.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Search => names::YOUTUBE_SEARCH,
            _ => names::YOUTUBE_CHANNELS,
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A channel directory service (the YouTube Data API in production).
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Looks a channel up. `Ok(None)` is a clean miss.
    async fn lookup(
        &self,
        kind: LookupKind,
        api_key: &str,
        query: &str,
    ) -> Result<Option<Channel>, CallError>;
}

/// One way of resolving an identifier to a channel.
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    /// Strategy id, e.g. `handle`.
    fn id(&self) -> &str;

    /// Sort key; cheaper strategies run first.
    fn cost(&self) -> u64;

    /// Catalog endpoint charged for one lookup.
    fn endpoint(&self) -> &str;

    /// Whether this strategy can handle `identifier` at all.
    fn applies_to(&self, identifier: &str) -> bool;

    /// When an exclusive strategy applies, no other strategy is tried.
    fn is_exclusive(&self) -> bool {
        false
    }

    /// Performs the lookup with `credential`.
    async fn lookup(
        &self,
        credential: &Credential,
        identifier: &str,
    ) -> Result<Option<Channel>, CallError>;
}

/// A [`ResolveStrategy`] backed by a [`ChannelDirectory`].
pub struct DirectoryStrategy {
    kind: LookupKind,
    directory: Arc<dyn ChannelDirectory>,
}

impl DirectoryStrategy {
    /// Creates a strategy of `kind` over `directory`.
    pub fn new(kind: LookupKind, directory: Arc<dyn ChannelDirectory>) -> Self {
        Self { kind, directory }
    }
}

#[async_trait]
impl ResolveStrategy for DirectoryStrategy {
    fn id(&self) -> &str {
        self.kind.id()
    }

    fn cost(&self) -> u64 {
        self.kind.cost()
    }

    fn endpoint(&self) -> &str {
        self.kind.endpoint()
    }

    fn applies_to(&self, identifier: &str) -> bool {
        match self.kind {
            LookupKind::NativeId => is_native_id(identifier),
            _ => !is_native_id(identifier),
        }
    }

    fn is_exclusive(&self) -> bool {
        self.kind == LookupKind::NativeId
    }

    async fn lookup(
        &self,
        credential: &Credential,
        identifier: &str,
    ) -> Result<Option<Channel>, CallError> {
        let query = match self.kind {
            LookupKind::Handle | LookupKind::Username => identifier.trim_start_matches('@'),
            LookupKind::NativeId | LookupKind::Search => identifier,
        };
        self.directory
            .lookup(self.kind, &credential.secret, query)
            .await
    }
}

// ============================================================================
// Attempts & Outcome
// ============================================================================

/// How one attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Found the channel.
    Hit,
    /// Clean miss; the next strategy runs.
    Miss,
    /// The call failed; the chain stopped.
    Error,
}

/// Record of a single strategy attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAttempt {
    /// Strategy that ran.
    pub strategy_id: String,
    /// Credential used, if one was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    /// Units charged for the attempt.
    pub cost: u64,
    /// How it ended.
    pub status: AttemptStatus,
    /// Failure message for [`AttemptStatus::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// How long it took.
    #[serde(skip)]
    pub duration: Duration,
}

/// A successful resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedChannel {
    /// The channel.
    pub channel: Channel,
    /// Strategy that found it.
    pub strategy_id: String,
    /// Identifier after normalisation.
    pub identifier: String,
}

/// Outcome of [`CostOrderedResolver::resolve`].
#[derive(Debug)]
pub struct ResolveOutcome {
    /// The result (success or final error).
    pub result: Result<ResolvedChannel, FetchError>,
    /// Every strategy attempted, in order.
    pub attempts: Vec<ResolveAttempt>,
    /// Total wall time.
    pub duration: Duration,
}

impl ResolveOutcome {
    /// Returns true if a channel was found.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Id of the strategy that found the channel.
    pub fn successful_strategy(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|r| r.strategy_id.as_str())
    }

    /// Quota units charged across all attempts.
    pub fn units_spent(&self) -> u64 {
        self.attempts.iter().map(|a| a.cost).sum()
    }

    /// Drops the attempt log.
    pub fn into_result(self) -> Result<ResolvedChannel, FetchError> {
        self.result
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Tries resolution strategies cheapest first.
pub struct CostOrderedResolver {
    pool: Arc<CredentialPool>,
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl CostOrderedResolver {
    /// Creates a resolver with the given strategies.
    pub fn new(pool: Arc<CredentialPool>, strategies: Vec<Box<dyn ResolveStrategy>>) -> Self {
        let mut resolver = Self { pool, strategies };
        resolver.sort_by_cost();
        resolver
    }

    /// Native id, handle, username and search over one directory.
    pub fn with_directory(pool: Arc<CredentialPool>, directory: Arc<dyn ChannelDirectory>) -> Self {
        let strategies = LookupKind::all()
            .into_iter()
            .map(|kind| {
                Box::new(DirectoryStrategy::new(kind, Arc::clone(&directory))) as Box<dyn ResolveStrategy>
            })
            .collect();
        Self::new(pool, strategies)
    }

    /// Adds a strategy.
    pub fn add_strategy(&mut self, strategy: Box<dyn ResolveStrategy>) {
        self.strategies.push(strategy);
        self.sort_by_cost();
    }

    /// Stable sort, so equal-cost strategies keep insertion order.
    fn sort_by_cost(&mut self) {
        self.strategies.sort_by_key(|s| s.cost());
    }

    /// Strategy ids in the order they would run.
    pub fn strategy_ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Resolves `identifier`, cheapest strategy first.
    #[instrument(skip(self), fields(strategies = self.strategies.len()))]
    pub async fn resolve(&self, identifier: &str) -> ResolveOutcome {
        let start = Instant::now();
        let mut attempts = Vec::new();

        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() {
            return ResolveOutcome {
                result: Err(FetchError::InvalidIdentifier(identifier)),
                attempts,
                duration: start.elapsed(),
            };
        }

        let applicable: Vec<&dyn ResolveStrategy> = self
            .strategies
            .iter()
            .map(|s| &**s)
            .filter(|s| s.applies_to(&identifier))
            .collect();
        let exclusive = applicable.iter().copied().find(|s| s.is_exclusive());
        let chain = match exclusive {
            Some(strategy) => vec![strategy],
            None => applicable,
        };

        debug!(identifier = %identifier, chain = ?chain.iter().map(|s| s.id()).collect::<Vec<_>>(), "Resolving channel");

        for strategy in chain {
            let catalog = &self.pool.config().ledger.catalog;
            let endpoint = catalog.get(strategy.endpoint());
            let class = endpoint.map(|e| e.resource_class.as_str());
            let charged = endpoint.filter(|e| e.enabled).map_or(0, |e| e.cost);

            // A quota error parks the key; the same strategy reruns on the next one.
            let mut tried: Vec<String> = Vec::new();
            let result = loop {
                let selected = match self.pool.get_available(class).await {
                    Ok(credential) if tried.contains(&credential.id) => {
                        warn!(strategy = %strategy.id(), credential = %credential.id, "Key still selectable after quota error");
                        Err(FetchError::NoCredentialAvailable {
                            class: self.pool.config().resource_class.clone(),
                        })
                    }
                    other => other,
                };
                let credential = match selected {
                    Ok(credential) => credential,
                    Err(error) => {
                        attempts.push(ResolveAttempt {
                            strategy_id: strategy.id().to_string(),
                            credential_id: None,
                            cost: 0,
                            status: AttemptStatus::Error,
                            error: Some(error.to_string()),
                            duration: Duration::ZERO,
                        });
                        break Err(error);
                    }
                };

                let attempt_start = Instant::now();
                let result = strategy.lookup(&credential, &identifier).await;
                let duration = attempt_start.elapsed();
                self.pool
                    .record_outcome(&credential, strategy.endpoint(), result.as_ref().err())
                    .await;

                let mut attempt = ResolveAttempt {
                    strategy_id: strategy.id().to_string(),
                    credential_id: Some(credential.id.clone()),
                    cost: charged,
                    status: AttemptStatus::Miss,
                    error: None,
                    duration,
                };

                match result {
                    Ok(found) => {
                        if found.is_some() {
                            attempt.status = AttemptStatus::Hit;
                        }
                        attempts.push(attempt);
                        break Ok(found);
                    }
                    Err(error) => {
                        attempt.cost = 0;
                        attempt.status = AttemptStatus::Error;
                        attempt.error = Some(error.to_string());
                        attempts.push(attempt);
                        if !error.is_quota() {
                            break Err(FetchError::from(error));
                        }
                        info!(strategy = %strategy.id(), credential = %credential.id, "Key out of quota, rotating");
                        tried.push(credential.id);
                    }
                }
            };

            match result {
                Ok(Some(channel)) => {
                    info!(strategy = %strategy.id(), channel = %channel.id, "Channel resolved");
                    return ResolveOutcome {
                        result: Ok(ResolvedChannel {
                            channel,
                            strategy_id: strategy.id().to_string(),
                            identifier,
                        }),
                        attempts,
                        duration: start.elapsed(),
                    };
                }
                Ok(None) => debug!(strategy = %strategy.id(), "Lookup missed"),
                Err(error) => {
                    warn!(strategy = %strategy.id(), error = %error, "Lookup failed, stopping");
                    return ResolveOutcome {
                        result: Err(error),
                        attempts,
                        duration: start.elapsed(),
                    };
                }
            }
        }

        info!(identifier = %identifier, attempts = attempts.len(), "Channel not found");
        ResolveOutcome {
            result: Err(FetchError::ChannelNotFound(identifier)),
            attempts,
            duration: start.elapsed(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
