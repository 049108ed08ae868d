//! CLI application for rule-cached template document extraction.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{GlobalOptions, batch, config, process, rules};

/// regcache - Extract fields from template documents, learning regex rules
/// from LLM answers
#[derive(Parser)]
#[command(name = "regcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the rule cache database (overrides store.db_path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single document
    Process(process::ProcessArgs),

    /// Process a dataset directory
    Batch(batch::BatchArgs),

    /// Inspect or reset the rule cache
    Rules(rules::RulesArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let global = GlobalOptions {
        config: cli.config,
        db: cli.db,
    };

    // Execute command
    match cli.command {
        Commands::Process(args) => process::run(args, &global).await,
        Commands::Batch(args) => batch::run(args, &global).await,
        Commands::Rules(args) => rules::run(args, &global).await,
        Commands::Config(args) => config::run(args, &global).await,
    }
}
