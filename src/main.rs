//! chainprobe - automated exploit triage for deployed smart contracts
//!
//! # WARNING
//! - Detection is heuristic. Findings are hypotheses, not verdicts.
//! - Execution happens on an isolated fork or a statistical simulation,
//!   never against the live contract.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use chainprobe::cli::commands;
use chainprobe::config::Config;

/// Automated exploit triage for deployed smart contracts
#[derive(Parser)]
#[command(name = "chainprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full triage pipeline against one contract
    Analyze {
        /// Contract address (0x-prefixed)
        contract: String,

        /// Chain id
        #[arg(long, default_value_t = 1)]
        chain_id: i64,

        /// Block number to pin analysis at
        #[arg(long)]
        block: i64,

        /// Sanitized source file for the contract
        #[arg(long)]
        source_file: PathBuf,
    },

    /// Scan a source file for danger signatures, no execution
    Scan {
        /// Source file to scan
        source_file: PathBuf,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chainprobe=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    info!("Configuration loaded from {}", cli.config);

    match cli.command {
        Commands::Analyze {
            contract,
            chain_id,
            block,
            source_file,
        } => commands::analyze(&config, &contract, chain_id, block, source_file).await,
        Commands::Scan { source_file } => commands::scan(source_file).await,
        Commands::Config => commands::show_config(&config),
    }
}
