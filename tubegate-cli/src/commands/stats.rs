//! Stats command - today's usage of the model tiers and the key pool.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::info;
use tubegate_core::UsageStats;
use tubegate_fetch::{CredentialUsage, PoolStats};

use super::{load_config, model_ledger, youtube_pool};
use crate::{Cli, OutputFormat};

/// Which ledgers to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Scope {
    /// Model tiers and keys.
    #[default]
    All,
    /// Model tiers only.
    Models,
    /// YouTube keys only.
    Keys,
}

/// Arguments for the stats command.
#[derive(Args, Default)]
pub struct StatsArgs {
    /// Which ledgers to show.
    #[arg(long, default_value = "all")]
    pub scope: Scope,
}

/// JSON shape of the stats command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<UsageStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<CredentialUsage>,
}

/// Runs the stats command.
pub async fn run(args: &StatsArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli).await?;
    info!(scope = ?args.scope, "Collecting usage");

    let mut out = StatsOutput {
        models: None,
        pool: None,
        keys: Vec::new(),
    };

    if args.scope != Scope::Keys {
        out.models = Some(model_ledger(&config).await.usage_stats().await);
    }
    if args.scope != Scope::Models {
        let pool = youtube_pool(&config).await;
        out.pool = Some(pool.stats().await);
        out.keys = pool.usage_status().await;
    }

    match cli.format {
        OutputFormat::Json => println!("{}", cli.json().format(&out)?),
        OutputFormat::Text => {
            let text = cli.text();
            let mut sections = Vec::new();
            if let Some(models) = &out.models {
                sections.push(text.format_usage("Model tiers", models));
            }
            if let Some(pool) = &out.pool {
                sections.push(text.format_keys(pool, &out.keys));
            }
            println!("{}", sections.join("\n\n"));
        }
    }

    Ok(())
}
