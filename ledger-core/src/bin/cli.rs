//! Ledger command-line driver
//!
//! Runs a command script through the interpreter, reading from a file or
//! from stdin when no path is given.

use anyhow::Context;
use clap::Parser;
use hashchain_ledger::{CommandProcessor, Config};
use std::io;
use std::path::PathBuf;

/// Run ledger command scripts
#[derive(Debug, Parser)]
#[command(name = "ledger-cli", version, about)]
struct Args {
    /// Script file; stdin when omitted
    script: Option<PathBuf>,

    /// TOML configuration file; LEDGER_* environment variables when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::from_env().context("failed to load config from environment")?,
    };
    tracing::debug!(
        algorithm = %config.hash_algorithm,
        max_balance = config.max_balance,
        "Loaded configuration"
    );

    let stdout = io::stdout();
    let mut processor = CommandProcessor::with_config(stdout.lock(), config);

    let summary = match &args.script {
        Some(path) => processor
            .process_file(path)
            .with_context(|| format!("failed to run script {}", path.display()))?,
        None => processor
            .process_script(io::stdin().lock())
            .context("failed to run script from stdin")?,
    };

    tracing::info!(
        commands = summary.commands,
        command_errors = summary.command_errors,
        ledger_failures = summary.ledger_failures,
        "Script finished"
    );

    if let Some(ledger) = processor.ledger() {
        if let Some(metrics) = ledger.metrics() {
            tracing::debug!(?metrics, "Ledger metrics");
        }
    }

    Ok(())
}
