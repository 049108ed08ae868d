//! Config command - manage configuration.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use regcache_core::models::config::RegcacheConfig;

use super::GlobalOptions;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "extraction.tie_break")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, global: &GlobalOptions) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(global),
        ConfigCommand::Init(init_args) => init_config(init_args, global),
        ConfigCommand::Get { key } => get_config(&key, global),
        ConfigCommand::Set { key, value } => set_config(&key, &value, global),
        ConfigCommand::Path => show_path(global),
    }
}

fn load_existing(global: &GlobalOptions) -> anyhow::Result<RegcacheConfig> {
    let config_path = global.config_path();
    if config_path.exists() {
        Ok(RegcacheConfig::from_file(&config_path)?)
    } else {
        Ok(RegcacheConfig::default())
    }
}

fn show_config(global: &GlobalOptions) -> anyhow::Result<()> {
    if !global.config_path().exists() {
        println!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }

    let config = load_existing(global)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs, global: &GlobalOptions) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(|| global.config_path());

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    // Create parent directory if needed
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let config = RegcacheConfig::default();
    config.save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn get_config(key: &str, global: &GlobalOptions) -> anyhow::Result<()> {
    let config = load_existing(global)?;
    let value = config.get_path(key)?;
    println!("{}", serde_json::to_string_pretty(&value)?);

    Ok(())
}

fn set_config(key: &str, value: &str, global: &GlobalOptions) -> anyhow::Result<()> {
    let config_path = global.config_path();
    let mut config = load_existing(global)?;

    // Bare words are taken as strings
    let parsed_value: serde_json::Value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    config.set_path(key, parsed_value.clone())?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    config.save(&config_path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn show_path(global: &GlobalOptions) -> anyhow::Result<()> {
    let config_path = global.config_path();

    println!("Configuration file: {}", config_path.display());

    if config_path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'regcache config init' to create a configuration file.");
    }

    Ok(())
}
