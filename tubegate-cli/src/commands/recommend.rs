//! Recommend command - which model tier to use right now.

use anyhow::Result;

use super::{load_config, orchestrator};
use crate::{Cli, OutputFormat};

/// Runs the recommend command.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli).await?;
    let recommendation = orchestrator(&config, false).await?.recommend().await;

    match cli.format {
        OutputFormat::Json => println!("{}", cli.json().format(&recommendation)?),
        OutputFormat::Text => println!("{}", cli.text().format_recommendation(recommendation.as_ref())),
    }

    Ok(())
}
