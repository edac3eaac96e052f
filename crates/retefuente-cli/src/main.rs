mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::withholding::{BatchArgs, EvaluateArgs, LiquidateArgs, NormalizeSharesArgs};
use commands::EngineContext;

/// Colombian withholding tax (retención en la fuente) liquidation
#[derive(Parser)]
#[command(
    name = "rete",
    version,
    about = "Colombian withholding tax liquidation",
    long_about = "Liquidates retención en la fuente for classified invoices with decimal \
                  precision. Supports single-issuer invoices and consortium invoices, \
                  where each member is allocated its share of the base and evaluated \
                  against the concept individually."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Concept catalog file (JSON or YAML); the built-in table is used if omitted
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Engine configuration file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log debug events to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Liquidate one classified invoice (single issuer or consortium)
    Liquidate(LiquidateArgs),
    /// Evaluate one concept for one base and subject type
    Evaluate(EvaluateArgs),
    /// Normalize declared consortium shares to sum to 100%
    NormalizeShares(NormalizeSharesArgs),
    /// Liquidate a batch of invoices
    Batch(BatchArgs),
    /// List the active concept catalog
    Concepts,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands, ctx: &EngineContext) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    match command {
        Commands::Liquidate(args) => commands::withholding::run_liquidate(args, ctx),
        Commands::Evaluate(args) => commands::withholding::run_evaluate(args, ctx),
        Commands::NormalizeShares(args) => commands::withholding::run_normalize_shares(args, ctx),
        Commands::Batch(args) => commands::withholding::run_batch(args, ctx),
        Commands::Concepts => commands::withholding::run_concepts(ctx),
        Commands::Version => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
    }
}

fn main() {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("rete {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    init_logging(cli.verbose);

    let result = EngineContext::load(cli.catalog.as_deref(), cli.config.as_deref())
        .and_then(|ctx| run(cli.command, &ctx));

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
