// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `TubeGate` CLI - quota-aware YouTube and Gemini calls from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Today's usage of the model tiers and the key pool
//! tubegate stats
//!
//! # Health report as pretty JSON
//! tubegate health --format json --pretty
//!
//! # Resolve a channel, cheapest lookup first
//! tubegate resolve https://www.youtube.com/@GoogleDevelopers
//!
//! # Ask the primary tier, falling back on quota errors
//! tubegate analyze --prompt "Compare these thumbnails" --image a.jpg --image b.jpg
//!
//! # Manage YouTube API keys
//! tubegate keys add AIza... --name "Main"
//! tubegate keys status
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tubegate_core::{ErrorKind, ErrorReport};
use tubegate_fetch::FetchError;
use tubegate_store::StoreError;

use commands::{analyze, config, health, keys, recommend, resolve, stats};
use output::{JsonFormatter, TextFormatter};

// ============================================================================
// CLI Definition
// ============================================================================

/// `TubeGate` CLI - quota governor for YouTube Data API and Gemini calls.
#[derive(Parser)]
#[command(name = "tubegate")]
#[command(about = "Quota-aware YouTube Data API and Gemini calls")]
#[command(long_about = r#"
TubeGate meters every call against daily budgets that reset at a fixed
local time (16:00 KST by default), rotates YouTube API keys when one runs
dry, and falls back from the primary Gemini model to the cheaper one when
the primary quota is spent.

Examples:
  tubegate stats                     # Today's usage
  tubegate health --format json      # Health report
  tubegate resolve @GoogleDevelopers # Cheapest-first channel lookup
  tubegate keys status               # Per-key usage
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'stats'.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file (defaults to <config dir>/tubegate/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for ledgers and credentials.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Text formatter honouring `--no-color`.
    pub fn text(&self) -> TextFormatter {
        TextFormatter::new(!self.no_color)
    }

    /// JSON formatter honouring `--pretty`.
    pub fn json(&self) -> JsonFormatter {
        JsonFormatter::new(self.pretty)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show today's usage (default if no command specified).
    #[command(visible_alias = "s")]
    Stats(stats::StatsArgs),

    /// Show the health of the model tiers and the key pool.
    #[command(visible_alias = "h")]
    Health,

    /// Show which model tier to use right now.
    Recommend,

    /// Resolve a channel identifier, cheapest lookup first.
    #[command(visible_alias = "r")]
    Resolve(resolve::ResolveArgs),

    /// Send a prompt (and optional images) to the model tiers.
    #[command(visible_alias = "a")]
    Analyze(analyze::AnalyzeArgs),

    /// Manage YouTube Data API keys.
    #[command(visible_alias = "k")]
    Keys(keys::KeysArgs),

    /// Show the effective configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Quota spent or no key available.
    QuotaExhausted = 2,
    /// Channel not found.
    NotFound = 3,
    /// Invalid configuration.
    ConfigError = 4,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("tubegate=debug,info")
    } else {
        EnvFilter::new("tubegate=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Error Reporting
// ============================================================================

/// Structured report and exit code for a failed command.
fn report_for(err: &anyhow::Error) -> (ErrorReport, ExitCode) {
    if let Some(fetch) = err.downcast_ref::<FetchError>() {
        let code = match fetch {
            FetchError::ChannelNotFound(_) | FetchError::CredentialNotFound(_) => ExitCode::NotFound,
            FetchError::Core(_) => ExitCode::ConfigError,
            _ if fetch.kind().is_retryable() => ExitCode::QuotaExhausted,
            _ => ExitCode::Error,
        };
        return (fetch.report(), code);
    }
    if let Some(store) = err.downcast_ref::<StoreError>() {
        return (
            ErrorReport::new(ErrorKind::PersistenceFailure, store.to_string()),
            ExitCode::Error,
        );
    }
    if err.downcast_ref::<tubegate_core::CoreError>().is_some() {
        return (
            ErrorReport::new(ErrorKind::InvalidConfig, format!("{err:#}")),
            ExitCode::ConfigError,
        );
    }
    (
        ErrorReport::new(ErrorKind::TransientCallFailure, format!("{err:#}")),
        ExitCode::Error,
    )
}

fn print_error(err: &anyhow::Error, cli: &Cli) -> ExitCode {
    let (report, code) = report_for(err);
    if cli.quiet {
        return code;
    }
    match cli.format {
        OutputFormat::Json => match cli.json().format(&serde_json::json!({ "error": report })) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error: {}", report.message),
        },
        OutputFormat::Text => eprintln!("{}", cli.text().format_error(&report)),
    }
    code
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Stats(args)) => stats::run(args, &cli).await,
        Some(Commands::Health) => health::run(&cli).await,
        Some(Commands::Recommend) => recommend::run(&cli).await,
        Some(Commands::Resolve(args)) => resolve::run(args, &cli).await,
        Some(Commands::Analyze(args)) => analyze::run(args, &cli).await,
        Some(Commands::Keys(args)) => keys::run(args, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
        None => stats::run(&stats::StatsArgs::default(), &cli).await,
    };

    if let Err(e) = result {
        let code = print_error(&e, &cli);
        std::process::exit(code as i32);
    }

    std::process::exit(ExitCode::Success as i32);
}
