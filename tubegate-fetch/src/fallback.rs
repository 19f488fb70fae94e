//! Two-tier generative model fallback.
//!
//! Every query goes to the primary tier first. Only a quota failure moves on
//! to the fallback tier, and only when fallback is enabled; any other primary
//! failure is returned as is. Each tier actually invoked records exactly one
//! outcome in the orchestrator's ledger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use tubegate_core::{CallError, GovernorConfig, Health, ModelTier, TierBinding, UsageStats};
use tubegate_store::UsageLedger;

use crate::error::FetchError;

// ============================================================================
// Tier Client
// ============================================================================

/// Image sent alongside a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

/// A generation request, identical for both tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Prompt text.
    pub prompt: String,
    /// Images sent after the prompt, in order.
    pub images: Vec<InlineImage>,
}

impl GenerationRequest {
    /// A text-only request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    /// Appends an image.
    pub fn with_image(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.images.push(InlineImage {
            mime_type: mime_type.into(),
            data,
        });
        self
    }
}

/// The generative service.
#[async_trait]
pub trait TierClient: Send + Sync {
    /// Generates text with `model`.
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<String, CallError>;
}

// ============================================================================
// Config
// ============================================================================

/// Tier bindings and the fallback switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Whether a primary quota failure moves on to the fallback tier.
    pub enable_fallback: bool,
    /// Primary tier.
    pub primary: TierBinding,
    /// Fallback tier.
    pub fallback: TierBinding,
}

impl OrchestratorConfig {
    /// Bindings taken from the governor configuration.
    pub fn from_governor(config: &GovernorConfig) -> Self {
        Self {
            enable_fallback: config.enable_fallback,
            primary: config.primary_binding(),
            fallback: config.fallback_binding(),
        }
    }

    /// The binding for `tier`.
    pub fn binding(&self, tier: ModelTier) -> &TierBinding {
        match tier {
            ModelTier::Primary => &self.primary,
            ModelTier::Fallback => &self.fallback,
        }
    }

    /// The tier charged to `class`, if any.
    pub fn tier_for_class(&self, class: &str) -> Option<ModelTier> {
        ModelTier::all()
            .into_iter()
            .find(|tier| self.binding(*tier).resource_class == class)
    }
}

/// A runtime change to the orchestrator. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorUpdate {
    /// Turns fallback on or off.
    pub enable_fallback: Option<bool>,
    /// New primary model endpoint.
    pub primary_model: Option<String>,
    /// New fallback model endpoint.
    pub fallback_model: Option<String>,
}

// ============================================================================
// Responses & Reports
// ============================================================================

/// A successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierResponse {
    /// Generated text.
    pub output: String,
    /// Tier that produced the output.
    pub tier: ModelTier,
    /// Model that produced the output.
    pub model: String,
    /// True if the primary tier was refused for quota.
    pub fallback_used: bool,
    /// True if the caller picked the tier.
    pub forced: bool,
    /// Wall time across every tier invoked.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

/// What [`ModelFallbackOrchestrator::recommend`] suggests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Resource class with budget left.
    pub resource_class: String,
    /// Tier bound to that class, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<ModelTier>,
    /// Model bound to that class, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Ledger health plus the current bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorHealth {
    /// Ledger health.
    #[serde(flatten)]
    pub health: Health,
    /// Current bindings.
    pub config: OrchestratorConfig,
}

/// Everything worth looking at when a query misbehaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    /// Current bindings.
    pub config: OrchestratorConfig,
    /// Today's usage.
    pub usage: UsageStats,
    /// Recommendation right now.
    pub recommended: Option<Recommendation>,
    /// Ledger file.
    pub ledger_path: Option<PathBuf>,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Primary-then-fallback generation over a [`TierClient`].
pub struct ModelFallbackOrchestrator {
    client: Arc<dyn TierClient>,
    ledger: Arc<UsageLedger>,
    config: RwLock<OrchestratorConfig>,
}

impl ModelFallbackOrchestrator {
    /// Creates an orchestrator recording into `ledger`.
    pub fn new(
        client: Arc<dyn TierClient>,
        ledger: Arc<UsageLedger>,
        config: OrchestratorConfig,
    ) -> Self {
        info!(
            primary = %config.primary.model,
            fallback = %config.fallback.model,
            enable_fallback = config.enable_fallback,
            "Model orchestrator ready"
        );
        Self {
            client,
            ledger,
            config: RwLock::new(config),
        }
    }

    /// The orchestrator's ledger.
    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    /// A copy of the current configuration.
    pub async fn config(&self) -> OrchestratorConfig {
        self.config.read().await.clone()
    }

    /// Runs `request` on the primary tier, falling back on quota errors.
    #[instrument(skip(self, request))]
    pub async fn query(&self, request: &GenerationRequest) -> Result<TierResponse, FetchError> {
        let config = self.config().await;
        let start = Instant::now();

        let primary_error = match self.invoke(&config.primary, request).await {
            Ok(output) => {
                return Ok(TierResponse {
                    output,
                    tier: ModelTier::Primary,
                    model: config.primary.model,
                    fallback_used: false,
                    forced: false,
                    duration: start.elapsed(),
                });
            }
            Err(err) => err,
        };

        if !primary_error.is_quota() {
            return Err(primary_error.into());
        }
        if !config.enable_fallback {
            warn!(model = %config.primary.model, "Primary tier out of quota and fallback is disabled");
            return Err(primary_error.into());
        }

        warn!(
            primary = %config.primary.model,
            fallback = %config.fallback.model,
            "Primary tier out of quota, falling back"
        );
        let output = self.invoke(&config.fallback, request).await?;
        Ok(TierResponse {
            output,
            tier: ModelTier::Fallback,
            model: config.fallback.model,
            fallback_used: true,
            forced: false,
            duration: start.elapsed(),
        })
    }

    /// Runs `request` on exactly `tier`, with no fallback.
    #[instrument(skip(self, request))]
    pub async fn query_with_tier(
        &self,
        tier: ModelTier,
        request: &GenerationRequest,
    ) -> Result<TierResponse, FetchError> {
        let binding = self.config.read().await.binding(tier).clone();
        let start = Instant::now();
        let output = self.invoke(&binding, request).await?;
        Ok(TierResponse {
            output,
            tier,
            model: binding.model,
            fallback_used: false,
            forced: true,
            duration: start.elapsed(),
        })
    }

    /// Applies a runtime change and returns the resulting configuration.
    pub async fn update_config(&self, update: OrchestratorUpdate) -> OrchestratorConfig {
        let mut config = self.config.write().await;
        if let Some(enable) = update.enable_fallback {
            config.enable_fallback = enable;
        }
        if let Some(model) = update.primary_model {
            config.primary.model = model;
        }
        if let Some(model) = update.fallback_model {
            config.fallback.model = model;
        }
        info!(
            primary = %config.primary.model,
            fallback = %config.fallback.model,
            enable_fallback = config.enable_fallback,
            "Model orchestrator reconfigured"
        );
        config.clone()
    }

    /// The class the ledger recommends, with the tier bound to it.
    pub async fn recommend(&self) -> Option<Recommendation> {
        let class = self.ledger.recommend().await?;
        let config = self.config.read().await;
        let tier = config.tier_for_class(&class);
        Some(Recommendation {
            model: tier.map(|t| config.binding(t).model.clone()),
            tier,
            resource_class: class,
        })
    }

    /// Ledger health with the current bindings.
    pub async fn health(&self) -> OrchestratorHealth {
        OrchestratorHealth {
            health: self.ledger.health().await,
            config: self.config().await,
        }
    }

    /// Configuration, usage and recommendation in one place.
    pub async fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            config: self.config().await,
            usage: self.ledger.usage_stats().await,
            recommended: self.recommend().await,
            ledger_path: self.ledger.path().map(PathBuf::from),
        }
    }

    /// Calls one tier and records its outcome.
    async fn invoke(&self, binding: &TierBinding, request: &GenerationRequest) -> Result<String, CallError> {
        let result = self.client.generate(&binding.model, request).await;
        self.ledger
            .increment(&binding.resource_class, result.is_ok())
            .await;
        match &result {
            Ok(_) => debug!(model = %binding.model, "Tier call succeeded"),
            Err(e) => debug!(model = %binding.model, error = %e, "Tier call failed"),
        }
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::sync::Mutex;
    use tubegate_core::ManualClock;
    use tubegate_store::LedgerConfig;

    /// Replays scripted results per model and counts calls.
    #[derive(Default)]
    struct ScriptedClient {
        script: Mutex<HashMap<String, VecDeque<Result<String, CallError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn push(&self, model: &str, result: Result<&str, CallError>) {
            self.script
                .lock()
                .unwrap()
                .entry(model.to_string())
                .or_default()
                .push_back(result.map(str::to_string));
        }

        fn calls(&self, model: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|m| *m == model).count()
        }
    }

    #[async_trait]
    impl TierClient for ScriptedClient {
        async fn generate(&self, model: &str, _request: &GenerationRequest) -> Result<String, CallError> {
            self.calls.lock().unwrap().push(model.to_string());
            self.script
                .lock()
                .unwrap()
                .get_mut(model)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(CallError::new("no scripted response")))
        }
    }

    fn quota() -> CallError {
        CallError::new("[429 Too Many Requests] Resource exhausted")
    }

    fn setup(enable_fallback: bool) -> (Arc<ScriptedClient>, ModelFallbackOrchestrator) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()));
        let budgets = BTreeMap::from([("pro".to_string(), 50), ("flash".to_string(), 250)]);
        let ledger = Arc::new(UsageLedger::in_memory(
            LedgerConfig::new(budgets).with_preference(["pro", "flash"]),
            clock,
        ));
        let config = OrchestratorConfig {
            enable_fallback,
            ..OrchestratorConfig::from_governor(&GovernorConfig::default())
        };
        let client = Arc::new(ScriptedClient::default());
        let orchestrator = ModelFallbackOrchestrator::new(client.clone(), ledger, config);
        (client, orchestrator)
    }

    async fn counters(orchestrator: &ModelFallbackOrchestrator, class: &str) -> (u64, u64) {
        orchestrator
            .ledger()
            .today_usage()
            .await
            .get(class)
            .map_or((0, 0), |c| (c.used, c.errors))
    }

    #[tokio::test]
    async fn test_primary_success() {
        let (client, orchestrator) = setup(true);
        client.push("gemini-2.5-pro", Ok("pro says hi"));

        let response = orchestrator.query(&GenerationRequest::text("hi")).await.unwrap();
        assert_eq!(response.output, "pro says hi");
        assert_eq!(response.tier, ModelTier::Primary);
        assert!(!response.fallback_used);
        assert!(!response.forced);
        assert_eq!(counters(&orchestrator, "pro").await, (1, 0));
        assert_eq!(counters(&orchestrator, "flash").await, (0, 0));
        assert_eq!(client.calls("gemini-2.5-flash"), 0);
    }

    #[tokio::test]
    async fn test_primary_quota_falls_back() {
        let (client, orchestrator) = setup(true);
        client.push("gemini-2.5-pro", Err(quota()));
        client.push("gemini-2.5-flash", Ok("flash says hi"));

        let response = orchestrator.query(&GenerationRequest::text("hi")).await.unwrap();
        assert_eq!(response.tier, ModelTier::Fallback);
        assert_eq!(response.model, "gemini-2.5-flash");
        assert!(response.fallback_used);
        assert_eq!(counters(&orchestrator, "pro").await, (0, 1));
        assert_eq!(counters(&orchestrator, "flash").await, (1, 0));
    }

    #[tokio::test]
    async fn test_both_tiers_fail() {
        let (client, orchestrator) = setup(true);
        client.push("gemini-2.5-pro", Err(quota()));
        client.push("gemini-2.5-flash", Err(CallError::with_status(500, "flash down")));

        let err = orchestrator.query(&GenerationRequest::text("hi")).await.unwrap_err();
        assert!(err.to_string().contains("flash down"));
        assert_eq!(counters(&orchestrator, "pro").await, (0, 1));
        assert_eq!(counters(&orchestrator, "flash").await, (0, 1));
    }

    #[tokio::test]
    async fn test_non_quota_error_does_not_fall_back() {
        let (client, orchestrator) = setup(true);
        client.push("gemini-2.5-pro", Err(CallError::with_status(400, "bad request")));

        let err = orchestrator.query(&GenerationRequest::text("hi")).await.unwrap_err();
        assert!(!err.is_quota());
        assert_eq!(client.calls("gemini-2.5-flash"), 0);
        assert_eq!(counters(&orchestrator, "pro").await, (0, 1));
        assert_eq!(counters(&orchestrator, "flash").await, (0, 0));
    }

    #[tokio::test]
    async fn test_fallback_disabled_returns_primary_error() {
        let (client, orchestrator) = setup(false);
        client.push("gemini-2.5-pro", Err(quota()));

        let err = orchestrator.query(&GenerationRequest::text("hi")).await.unwrap_err();
        assert!(err.is_quota());
        assert_eq!(client.calls("gemini-2.5-flash"), 0);
        assert_eq!(counters(&orchestrator, "pro").await, (0, 1));
    }

    #[tokio::test]
    async fn test_forced_tier() {
        let (client, orchestrator) = setup(true);
        client.push("gemini-2.5-flash", Ok("forced"));

        let response = orchestrator
            .query_with_tier(ModelTier::Fallback, &GenerationRequest::text("hi"))
            .await
            .unwrap();
        assert!(response.forced);
        assert_eq!(response.tier, ModelTier::Fallback);
        assert_eq!(client.calls("gemini-2.5-pro"), 0);
        assert_eq!(counters(&orchestrator, "flash").await, (1, 0));

        client.push("gemini-2.5-pro", Err(quota()));
        let err = orchestrator
            .query_with_tier(ModelTier::Primary, &GenerationRequest::text("hi"))
            .await
            .unwrap_err();
        assert!(err.is_quota());
        assert_eq!(client.calls("gemini-2.5-flash"), 1);
        assert_eq!(counters(&orchestrator, "pro").await, (0, 1));
    }

    #[tokio::test]
    async fn test_update_config_rebinds_models() {
        let (client, orchestrator) = setup(true);
        let config = orchestrator
            .update_config(OrchestratorUpdate {
                enable_fallback: Some(false),
                primary_model: Some("gemini-2.5-pro-exp".to_string()),
                ..OrchestratorUpdate::default()
            })
            .await;
        assert!(!config.enable_fallback);

        client.push("gemini-2.5-pro-exp", Ok("new model"));
        let response = orchestrator.query(&GenerationRequest::text("hi")).await.unwrap();
        assert_eq!(response.model, "gemini-2.5-pro-exp");
        assert_eq!(counters(&orchestrator, "pro").await, (1, 0));
    }

    #[tokio::test]
    async fn test_recommend_maps_class_to_tier() {
        let (_client, orchestrator) = setup(true);
        let recommendation = orchestrator.recommend().await.unwrap();
        assert_eq!(recommendation.resource_class, "pro");
        assert_eq!(recommendation.tier, Some(ModelTier::Primary));
        assert_eq!(recommendation.model.as_deref(), Some("gemini-2.5-pro"));

        let info = orchestrator.debug_info().await;
        assert!(info.ledger_path.is_none());
        assert_eq!(info.usage.total.quota, 300);
    }
}
