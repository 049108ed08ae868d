//! Per-document pipeline and batch driver.

use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use super::filter::split_viable;
use super::learner::LearningEngine;
use super::resolver::FieldResolver;
use crate::dataset::EntryResult;
use crate::error::Result;
use crate::llm::LlmFallback;
use crate::models::config::{ExtractionConfig, MergePrecedence};
use crate::models::document::{
    BatchFailure, BatchReport, DatasetEntry, DocumentResult, ExtractionSchema, ExtractionStats,
    FieldValues,
};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::rules::PatternLibrary;
use crate::source::TextSource;
use crate::store::{self, RuleStore};

/// Runs resolve, fallback, learn and merge for each document.
///
/// Documents are processed one at a time. Several orchestrators may share one
/// store; the store serializes their writes.
pub struct Orchestrator {
    store: Arc<dyn RuleStore>,
    patterns: Arc<PatternLibrary>,
    fallback: LlmFallback,
    source: Box<dyn TextSource>,
    options: ExtractionConfig,
    rng: StdRng,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RuleStore>,
        patterns: Arc<PatternLibrary>,
        fallback: LlmFallback,
        source: Box<dyn TextSource>,
        options: ExtractionConfig,
    ) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            store,
            patterns,
            fallback,
            source,
            options,
            rng,
        }
    }

    /// Replace the tie-break randomness source.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Extract `schema` from already-loaded text.
    ///
    /// Every schema field is present in the returned map, `None` when neither
    /// pass found a value. Only store failures are errors.
    pub fn extract(
        &mut self,
        label: &str,
        schema: &ExtractionSchema,
        text: &str,
    ) -> store::Result<(FieldValues, ExtractionStats)> {
        let mut stats = ExtractionStats::default();
        let mut values: FieldValues = schema.keys().map(|field| (field.clone(), None)).collect();

        let viable = if self.options.prefilter_fields {
            let (viable, nulled) = split_viable(schema, text);
            stats.prefiltered = nulled.len();
            viable
        } else {
            schema.clone()
        };

        let resolver = FieldResolver::new(&*self.store, &self.patterns, self.options.tie_break);
        let resolution = resolver.resolve(label, &viable, text, &mut self.rng)?;

        let answers = if resolution.unresolved.is_empty() {
            FieldValues::new()
        } else {
            stats.llm_called = true;
            self.fallback.extract(&resolution.unresolved, text)
        };

        // Learn only from fields that were actually routed to the LLM
        let learner = LearningEngine::new(&*self.store, &self.patterns);
        let report = learner.learn(
            label,
            answers
                .iter()
                .filter(|(field, _)| resolution.unresolved.contains_key(*field))
                .map(|(field, value)| (field.as_str(), value.as_deref())),
        )?;
        stats.learned = report.learned;
        stats.conflicts = report.conflicts;

        for (field, value) in &resolution.resolved {
            values.insert(field.clone(), Some(value.clone()));
            stats.heuristic += 1;
        }

        for (field, value) in answers {
            let Some(value) = value else { continue };
            if !schema.contains_key(&field) {
                debug!(label, field = %field, "ignoring answer outside the schema");
                continue;
            }
            if !viable.contains_key(&field) {
                continue;
            }

            let from_heuristic = resolution.resolved.contains_key(&field);
            if from_heuristic && self.options.merge_precedence == MergePrecedence::Heuristic {
                continue;
            }
            if from_heuristic {
                stats.heuristic -= 1;
            }
            values.insert(field, Some(value));
            stats.llm += 1;
        }

        Ok((values, stats))
    }

    /// Load one document and extract its schema.
    pub fn process_document(&mut self, entry: &DatasetEntry) -> Result<DocumentResult> {
        let start = Instant::now();
        let text = self.source.full_text(&entry.document)?;
        let (extracted_fields, stats) = self.extract(&entry.label, &entry.schema, &text)?;
        let duration_seconds = start.elapsed().as_secs_f64();

        info!(
            document = %entry.document,
            label = %entry.label,
            heuristic = stats.heuristic,
            llm = stats.llm,
            "Processed in {:.2}s",
            duration_seconds
        );

        Ok(DocumentResult {
            document: entry.document.clone(),
            label: entry.label.clone(),
            duration_seconds,
            extracted_fields,
            stats,
        })
    }

    /// Process every entry in order, reporting progress to `sink`.
    ///
    /// Malformed entries and per-document failures are recorded and skipped.
    /// Any other error, a store failure in particular, stops the batch.
    pub fn run_batch(
        &mut self,
        entries: Vec<EntryResult>,
        sink: &dyn ProgressSink,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        sink.emit(ProgressEvent::Started {
            total: entries.len(),
        });

        for (index, entry) in entries.into_iter().enumerate() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping entry #{}: {}", index, e);
                    let failure = BatchFailure {
                        index,
                        document: None,
                        message: e.to_string(),
                    };
                    sink.emit(error_event(&failure, None));
                    report.failures.push(failure);
                    continue;
                }
            };

            match self.process_document(&entry) {
                Ok(result) => {
                    sink.emit(ProgressEvent::Document(result.clone()));
                    report.results.push(result);
                }
                Err(e) if e.is_per_document() => {
                    warn!("Skipping {}: {}", entry.document, e);
                    let failure = BatchFailure {
                        index,
                        document: Some(entry.document.clone()),
                        message: e.to_string(),
                    };
                    sink.emit(error_event(&failure, Some(&entry.label)));
                    report.failures.push(failure);
                }
                Err(e) => {
                    error!("Batch aborted at {}: {}", entry.document, e);
                    let failure = BatchFailure {
                        index,
                        document: Some(entry.document.clone()),
                        message: e.to_string(),
                    };
                    sink.emit(error_event(&failure, Some(&entry.label)));
                    return Err(e);
                }
            }
        }

        sink.emit(ProgressEvent::Finished {
            processed: report.results.len(),
            failed: report.failures.len(),
        });
        Ok(report)
    }
}

fn error_event(failure: &BatchFailure, label: Option<&str>) -> ProgressEvent {
    ProgressEvent::Error {
        index: failure.index,
        document: failure.document.clone(),
        label: label.map(str::to_string),
        message: failure.message.clone(),
    }
}
