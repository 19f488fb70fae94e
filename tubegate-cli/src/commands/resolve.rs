//! Resolve command - channel lookup, cheapest strategy first.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use tubegate_fetch::{CostOrderedResolver, ResolveAttempt, ResolvedChannel};
use tubegate_providers::YouTubeClient;

use super::{load_config, youtube_pool};
use crate::{Cli, OutputFormat};

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Channel id, handle, username, channel URL or free text.
    pub identifier: String,

    /// Show every strategy attempted.
    #[arg(long)]
    pub attempts: bool,
}

/// JSON shape of a successful resolution.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutput {
    #[serde(flatten)]
    pub resolved: ResolvedChannel,
    pub units_spent: u64,
    pub attempts: Vec<ResolveAttempt>,
}

/// Runs the resolve command.
pub async fn run(args: &ResolveArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli).await?;
    let pool = youtube_pool(&config).await;
    let directory = YouTubeClient::new().context("Failed to create YouTube client")?;
    let resolver = CostOrderedResolver::with_directory(pool, Arc::new(directory));

    debug!(strategies = ?resolver.strategy_ids(), "Resolving channel");
    let outcome = resolver.resolve(&args.identifier).await;
    let units_spent = outcome.units_spent();

    if args.attempts && cli.format == OutputFormat::Text {
        let text = cli.text();
        for attempt in &outcome.attempts {
            eprintln!("{}", text.format_attempt(attempt));
        }
    }

    let resolved = match outcome.result {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(identifier = %args.identifier, units_spent, error = %e, "Resolution failed");
            return Err(e.into());
        }
    };

    match cli.format {
        OutputFormat::Json => {
            let out = ResolveOutput {
                resolved,
                units_spent,
                attempts: outcome.attempts,
            };
            println!("{}", cli.json().format(&out)?);
        }
        OutputFormat::Text => println!("{}", cli.text().format_channel(&resolved, units_spent)),
    }

    Ok(())
}
