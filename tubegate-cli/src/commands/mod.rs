//! CLI command implementations.

pub mod analyze;
pub mod config;
pub mod health;
pub mod keys;
pub mod recommend;
pub mod resolve;
pub mod stats;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;
use tubegate_core::{Clock, GovernorConfig, SystemClock};
use tubegate_fetch::{CredentialPool, ModelFallbackOrchestrator, OrchestratorConfig, PoolConfig};
use tubegate_providers::GeminiClient;
use tubegate_store::{LedgerConfig, UsageLedger, load_json_or_default};

use crate::Cli;

/// Environment variable holding the Gemini API key.
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Loads the configuration: JSON file, then environment, then flags.
pub async fn load_config(cli: &Cli) -> Result<GovernorConfig> {
    let path = cli.config.clone().unwrap_or_else(GovernorConfig::default_path);
    debug!(path = %path.display(), "Loading configuration");

    let mut config: GovernorConfig = load_json_or_default(&path).await;
    config.apply_env(|name| std::env::var(name).ok())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// Opens the model-tier ledger.
pub async fn model_ledger(config: &GovernorConfig) -> Arc<UsageLedger> {
    Arc::new(UsageLedger::open(LedgerConfig::for_models(config), clock()).await)
}

/// Opens the YouTube key pool and imports keys from the environment.
pub async fn youtube_pool(config: &GovernorConfig) -> Arc<CredentialPool> {
    let pool = CredentialPool::open(PoolConfig::youtube(config), clock()).await;
    let imported = pool.load_from_env().await;
    if imported > 0 {
        debug!(imported, "Imported keys from the environment");
    }
    Arc::new(pool)
}

/// Builds the tier orchestrator.
///
/// Commands that never call the model (health, recommend) pass
/// `require_key = false` and get a client with an empty key.
pub async fn orchestrator(config: &GovernorConfig, require_key: bool) -> Result<ModelFallbackOrchestrator> {
    let key = match std::env::var(GEMINI_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => key,
        _ if require_key => anyhow::bail!("{GEMINI_KEY_ENV} is not set"),
        _ => String::new(),
    };
    let client = GeminiClient::new(&key).context("Failed to create Gemini client")?;
    let ledger = model_ledger(config).await;
    Ok(ModelFallbackOrchestrator::new(
        Arc::new(client),
        ledger,
        OrchestratorConfig::from_governor(config),
    ))
}
