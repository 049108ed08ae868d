//! Process command - extract fields from a single document.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use regcache_core::dataset::parse_schema;
use regcache_core::models::document::{DatasetEntry, DocumentResult};
use regcache_core::{FileTextSource, RuleStore};

use super::{GlobalOptions, build_orchestrator};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Document type the rules are cached under
    #[arg(short, long)]
    label: String,

    /// Fields to extract, as a JSON object of name -> description
    #[arg(short, long)]
    schema: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for the tie-break between several matching tokens
    #[arg(long)]
    seed: Option<u64>,
}

pub async fn run(args: ProcessArgs, global: &GlobalOptions) -> anyhow::Result<()> {
    let mut config = global.load_config()?;
    if args.seed.is_some() {
        config.extraction.seed = args.seed;
    }

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let schema = parse_schema(serde_json::Value::String(args.schema.clone()))
        .map_err(|e| anyhow::anyhow!("Invalid --schema: {}", e))?;

    let document = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid input path: {}", args.input.display()))?
        .to_string();
    let root = args
        .input
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let entry = DatasetEntry {
        document,
        label: args.label.clone(),
        schema,
    };
    let store: Arc<dyn RuleStore> = Arc::new(global.open_store(&config)?);

    let result = tokio::task::spawn_blocking(move || -> anyhow::Result<DocumentResult> {
        let mut orchestrator =
            build_orchestrator(&config, store, Box::new(FileTextSource::new(root)))?;
        Ok(orchestrator.process_document(&entry)?)
    })
    .await??;

    info!(
        "Extracted {} fields ({} from cached rules)",
        result.extracted_fields.len(),
        result.stats.heuristic
    );

    let content = serde_json::to_string_pretty(&result)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &content)?;
        println!(
            "{} Output written to {} in {:.2}s",
            style("✓").green(),
            output_path.display(),
            result.duration_seconds
        );
    } else {
        println!("{}", content);
    }

    Ok(())
}
