//! Keys command - manage the YouTube Data API key pool.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::info;
use tubegate_fetch::{CredentialUsage, NewCredential, PoolStats};

use super::{load_config, youtube_pool};
use crate::{Cli, OutputFormat};

/// Arguments for the keys command.
#[derive(Args)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub action: KeysAction,
}

/// Keys subcommands.
#[derive(Subcommand)]
pub enum KeysAction {
    /// List keys (masked).
    List,

    /// Add a key.
    Add {
        /// The API key.
        key: String,

        /// Display name.
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Remove a key by id.
    Remove {
        /// Key id, as shown by `keys list`.
        id: String,
    },

    /// Per-key usage for today.
    Status,
}

/// JSON shape of `keys status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysStatusOutput {
    pub stats: PoolStats,
    pub keys: Vec<CredentialUsage>,
}

/// Runs the keys command.
pub async fn run(args: &KeysArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli).await?;
    let pool = youtube_pool(&config).await;

    match &args.action {
        KeysAction::List => {
            let keys = pool.usage_status().await;
            match cli.format {
                OutputFormat::Json => println!("{}", cli.json().format(&keys)?),
                OutputFormat::Text => println!("{}", cli.text().format_key_list(&keys)),
            }
        }
        KeysAction::Add { key, name } => {
            let mut new = NewCredential::manual(key.clone());
            if let Some(name) = name {
                new = new.named(name.clone());
            }
            let outcome = pool.add(new).await?;
            info!(id = %outcome.credential.id, duplicate = outcome.duplicate, "Key added");

            let credential = &outcome.credential;
            match cli.format {
                OutputFormat::Json => println!(
                    "{}",
                    cli.json().format(&serde_json::json!({
                        "id": credential.id,
                        "name": credential.name,
                        "key": credential.masked(),
                        "duplicate": outcome.duplicate,
                    }))?
                ),
                OutputFormat::Text if outcome.duplicate => {
                    println!("Key already present as {} ({})", credential.id, credential.name);
                }
                OutputFormat::Text => {
                    println!("Added {} ({}) {}", credential.id, credential.name, credential.masked());
                }
            }
        }
        KeysAction::Remove { id } => {
            let removed = pool.remove(id).await?;
            match cli.format {
                OutputFormat::Json => println!(
                    "{}",
                    cli.json().format(&serde_json::json!({ "removed": removed.id }))?
                ),
                OutputFormat::Text => println!("Removed {} ({})", removed.id, removed.name),
            }
        }
        KeysAction::Status => {
            let out = KeysStatusOutput {
                stats: pool.stats().await,
                keys: pool.usage_status().await,
            };
            match cli.format {
                OutputFormat::Json => println!("{}", cli.json().format(&out)?),
                OutputFormat::Text => println!("{}", cli.text().format_keys(&out.stats, &out.keys)),
            }
        }
    }

    Ok(())
}
