//! Health command - model tier and key pool health.

use anyhow::Result;
use serde::Serialize;
use tubegate_core::{Health, HealthStatus};
use tubegate_fetch::{OrchestratorHealth, PoolStats};

use super::{load_config, orchestrator, youtube_pool};
use crate::{Cli, OutputFormat};

/// JSON shape of the health command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOutput {
    /// Worst status across both ledgers.
    pub status: HealthStatus,
    pub models: OrchestratorHealth,
    pub keys: KeysHealth,
}

/// Health of the key pool.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub stats: PoolStats,
}

impl KeysHealth {
    /// Pool health from its counts: exhausted when no key can be handed out.
    pub fn from_stats(stats: PoolStats) -> Self {
        let usable = stats.active.saturating_sub(stats.exhausted);
        let mut warnings = Vec::new();
        let status = if usable == 0 {
            warnings.push(if stats.total == 0 {
                "no YouTube API keys configured".to_string()
            } else {
                "all YouTube API keys exhausted or inactive".to_string()
            });
            HealthStatus::Exhausted
        } else if usable < stats.total {
            warnings.push(format!("{usable} of {} keys usable", stats.total));
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        Self { status, warnings, stats }
    }
}

/// Worse of two statuses.
pub fn worst(a: HealthStatus, b: HealthStatus) -> HealthStatus {
    fn rank(status: HealthStatus) -> u8 {
        match status {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Exhausted => 2,
        }
    }
    if rank(b) > rank(a) { b } else { a }
}

/// Runs the health command.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli).await?;
    let models = orchestrator(&config, false).await?.health().await;
    let keys = KeysHealth::from_stats(youtube_pool(&config).await.stats().await);
    let out = HealthOutput {
        status: worst(models.health.status, keys.status),
        models,
        keys,
    };

    match cli.format {
        OutputFormat::Json => println!("{}", cli.json().format(&out)?),
        OutputFormat::Text => {
            let text = cli.text();
            let keys = Health {
                status: out.keys.status,
                warnings: out.keys.warnings.clone(),
                recommended: None,
            };
            println!(
                "{}\n\n{}",
                text.format_health("Model tiers", &out.models.health),
                text.format_health("YouTube keys", &keys)
            );
        }
    }

    Ok(())
}
