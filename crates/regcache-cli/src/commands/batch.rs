//! Batch processing command for a dataset directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use regcache_core::models::document::{BatchReport, DocumentResult};
use regcache_core::{Dataset, FileTextSource, ProgressEvent, RuleStore};

use super::{GlobalOptions, build_orchestrator};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Dataset directory holding dataset.json and a files/ folder
    #[arg(required = true)]
    directory: PathBuf,

    /// Results file (default: <DIRECTORY>/results.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also generate a summary CSV next to the results
    #[arg(long)]
    summary: bool,

    /// Seed for the tie-break between several matching tokens
    #[arg(long)]
    seed: Option<u64>,

    /// Null out fields whose name never appears in the document
    #[arg(long)]
    prefilter: bool,
}

pub async fn run(args: BatchArgs, global: &GlobalOptions) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = global.load_config()?;
    if args.seed.is_some() {
        config.extraction.seed = args.seed;
    }
    if args.prefilter {
        config.extraction.prefilter_fields = true;
    }

    let dataset = Dataset::load(&args.directory)?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.directory.join("results.json"));

    println!(
        "{} Found {} documents in {}",
        style("ℹ").blue(),
        dataset.len(),
        args.directory.display()
    );

    let store: Arc<dyn RuleStore> = Arc::new(global.open_store(&config)?);
    let files_dir = dataset.files_dir();
    let entries = dataset.entries;

    let progress = ProgressBar::new(entries.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?
            .progress_chars("=>-"),
    );

    // Events flow from the pipeline thread to the progress display
    let (tx, rx) = mpsc::channel::<ProgressEvent>();
    let collector = {
        let progress = progress.clone();
        tokio::task::spawn_blocking(move || {
            for event in rx {
                show_event(&progress, event);
            }
        })
    };

    let worker = tokio::task::spawn_blocking(move || -> anyhow::Result<BatchReport> {
        let mut orchestrator =
            build_orchestrator(&config, store, Box::new(FileTextSource::new(files_dir)))?;
        Ok(orchestrator.run_batch(entries, &tx)?)
    });

    let report = worker.await?;
    collector.await?;
    if report.is_err() {
        progress.abandon();
    }
    let report = report?;

    report.write_json(&output_path)?;
    println!(
        "{} Results written to {}",
        style("✓").green(),
        output_path.display()
    );

    if args.summary {
        let summary_path = output_path.with_file_name("summary.csv");
        write_summary(&summary_path, &report)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let totals = report.totals();
    println!();
    println!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        report.attempted(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(report.results.len()).green(),
        style(report.failures.len()).red()
    );
    println!(
        "   {} fields from cached rules, {} from the LLM, {} rules learned, {} conflicts",
        totals.heuristic, totals.llm, totals.learned, totals.conflicts
    );

    if !report.failures.is_empty() {
        println!();
        println!("{}", style("Failed documents:").red());
        for failure in &report.failures {
            println!(
                "  - #{} {}: {}",
                failure.index,
                failure.document.as_deref().unwrap_or("<no document>"),
                failure.message
            );
        }
    }

    Ok(())
}

fn show_event(progress: &ProgressBar, event: ProgressEvent) {
    match event {
        ProgressEvent::Started { total } => {
            progress.set_length(total as u64);
        }
        ProgressEvent::Document(result) => {
            debug!("{} done in {:.2}s", result.document, result.duration_seconds);
            progress.set_message(result.document);
            progress.inc(1);
        }
        ProgressEvent::Error {
            document, message, ..
        } => {
            progress.println(format!(
                "{} {}: {}",
                style("✗").red(),
                document.as_deref().unwrap_or("<entry>"),
                message
            ));
            progress.inc(1);
        }
        ProgressEvent::Finished { .. } => {
            progress.finish_with_message("Complete");
        }
    }
}

fn write_summary(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "document",
        "label",
        "status",
        "duration_seconds",
        "fields",
        "resolved",
        "heuristic",
        "llm",
        "learned",
        "conflicts",
        "error",
    ])?;

    for result in &report.results {
        write_result(&mut wtr, result)?;
    }

    for failure in &report.failures {
        wtr.write_record([
            failure.document.as_deref().unwrap_or(""),
            "",
            "error",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            failure.message.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_result<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    result: &DocumentResult,
) -> anyhow::Result<()> {
    let resolved = result
        .extracted_fields
        .values()
        .filter(|v| v.is_some())
        .count();

    wtr.write_record([
        result.document.as_str(),
        result.label.as_str(),
        "success",
        &format!("{:.3}", result.duration_seconds),
        &result.extracted_fields.len().to_string(),
        &resolved.to_string(),
        &result.stats.heuristic.to_string(),
        &result.stats.llm.to_string(),
        &result.stats.learned.to_string(),
        &result.stats.conflicts.to_string(),
        "",
    ])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regcache_core::models::document::{BatchFailure, ExtractionStats, FieldValues};

    #[test]
    fn test_summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let report = BatchReport {
            results: vec![DocumentResult {
                document: "rg1.pdf".to_string(),
                label: "RG".to_string(),
                duration_seconds: 1.25,
                extracted_fields: FieldValues::from([
                    ("data_emissao".to_string(), Some("04/02/2021".to_string())),
                    ("nome".to_string(), None),
                ]),
                stats: ExtractionStats {
                    heuristic: 1,
                    ..Default::default()
                },
            }],
            failures: vec![BatchFailure {
                index: 1,
                document: Some("rg2.pdf".to_string()),
                message: "no text extracted from rg2.pdf".to_string(),
            }],
        };

        write_summary(&path, &report).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "rg1.pdf,RG,success,1.250,2,1,1,0,0,0,");
        assert_eq!(lines[2], "rg2.pdf,,error,,,,,,,,no text extracted from rg2.pdf");
    }
}
