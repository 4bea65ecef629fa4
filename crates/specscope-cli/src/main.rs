//! SpecScope command-line tools
//!
//! - `analyze`: interference rates by hour, weekday, month and daypart
//! - `monitor`: threshold detection inside one frequency band
//! - `replay`: batch predictions for a CSV file
//! - `train`: fit and evaluate the interference classifier
//! - `simulate`: write a synthetic spectrum sweep as JSON

mod analyze;
mod monitor;
mod replay;
mod simulate;
mod source;
mod train;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use specscope_common::config::SpecscopeConfig;

/// SpecScope RF spectrum interference tools.
#[derive(Parser, Debug)]
#[command(name = "specscope", version, about = "RF spectrum interference analysis")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print interference rates grouped by time dimension.
    Analyze(analyze::Args),
    /// Flag readings above a power threshold inside a band.
    Monitor(monitor::Args),
    /// Predict every row of a CSV file.
    Replay(replay::Args),
    /// Train the classifier on a JSON dataset.
    Train(train::Args),
    /// Generate a synthetic sweep (`<output> <samples>`).
    Simulate(simulate::Args),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SpecscopeConfig::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Command::Analyze(args) => analyze::run(args, &config),
        Command::Monitor(args) => monitor::run(args, &config),
        Command::Replay(args) => replay::run(args, &config),
        Command::Train(args) => train::run(args, &config),
        Command::Simulate(args) => simulate::run(args),
    }
}

fn main() -> ExitCode {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
