//! Document, schema and batch result models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// Field name -> human description, as given to the LLM.
pub type ExtractionSchema = BTreeMap<String, String>;

/// Field name -> extracted value, `None` when nothing was found.
pub type FieldValues = BTreeMap<String, Option<String>>;

/// One document to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Document reference, relative to the document root.
    pub document: String,

    /// Document type.
    pub label: String,

    /// Fields to extract.
    pub schema: ExtractionSchema,
}

/// Per-document extraction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Fields resolved by a cached rule.
    pub heuristic: usize,
    /// Fields resolved by the LLM.
    pub llm: usize,
    /// Fields skipped by the name prefilter.
    pub prefiltered: usize,
    /// Whether the LLM was called for this document.
    pub llm_called: bool,
    /// Rules newly saved from this document's LLM answer.
    pub learned: usize,
    /// Keys this document pushed into the conflicting state.
    pub conflicts: usize,
}

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Document reference.
    pub document: String,

    /// Document type.
    pub label: String,

    /// Wall time spent on this document.
    pub duration_seconds: f64,

    /// Merged field values.
    pub extracted_fields: FieldValues,

    /// Counters, not part of the persisted output.
    #[serde(skip)]
    pub stats: ExtractionStats,
}

/// A document that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Position in the dataset.
    pub index: usize,

    /// Document reference, when the entry had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    pub message: String,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Successful documents in dataset order.
    pub results: Vec<DocumentResult>,

    /// Skipped documents.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Total documents attempted.
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// Aggregate counters over every successful document.
    pub fn totals(&self) -> ExtractionStats {
        self.results
            .iter()
            .fold(ExtractionStats::default(), |mut acc, r| {
                acc.heuristic += r.stats.heuristic;
                acc.llm += r.stats.llm;
                acc.prefiltered += r.stats.prefiltered;
                acc.llm_called |= r.stats.llm_called;
                acc.learned += r.stats.learned;
                acc.conflicts += r.stats.conflicts;
                acc
            })
    }

    /// Write the results as one JSON array.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.results)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
