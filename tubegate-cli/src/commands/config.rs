//! Config command - show the effective configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::load_config;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the configuration after file, environment and flags.
    Show,

    /// Show configuration and data paths.
    Path,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli).await?;

    match &args.action {
        ConfigAction::Show => match cli.format {
            OutputFormat::Json => println!("{}", cli.json().format(&config)?),
            OutputFormat::Text => println!("{}", cli.text().format_config(&config)),
        },
        ConfigAction::Path => {
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(tubegate_core::GovernorConfig::default_path);
            let paths = serde_json::json!({
                "config": config_path,
                "dataDir": config.data_dir(),
                "modelLedger": config.model_ledger_path(),
                "credentials": config.credentials_path(),
                "keyLedgers": config.key_ledger_dir(),
            });
            match cli.format {
                OutputFormat::Json => println!("{}", cli.json().format(&paths)?),
                OutputFormat::Text => {
                    println!("Config:       {}", config_path.display());
                    println!("Data dir:     {}", config.data_dir().display());
                    println!("Model ledger: {}", config.model_ledger_path().display());
                    println!("Credentials:  {}", config.credentials_path().display());
                    println!("Key ledgers:  {}", config.key_ledger_dir().display());
                }
            }
        }
    }

    Ok(())
}
