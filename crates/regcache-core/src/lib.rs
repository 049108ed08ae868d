//! Core library for adaptive regex-rule caching in front of LLM extraction.
//!
//! This crate provides:
//! - A named pattern library for Brazilian document formats
//! - A persistent (label, field) rule cache with one-way conflict marking
//! - A heuristic resolver, an LLM fallback and a learning pass
//! - A batch orchestrator with progress events
//! - Dataset loading and PDF/text document sources

pub mod dataset;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod models;
pub mod pdf;
pub mod progress;
pub mod rules;
pub mod source;
pub mod store;

pub use dataset::Dataset;
pub use error::{RegcacheError, Result};
pub use extraction::{FieldResolver, LearningEngine, Orchestrator, Resolution};
pub use llm::{LlmClient, LlmFallback, OpenAiClient};
pub use models::config::RegcacheConfig;
pub use models::document::{BatchReport, DatasetEntry, DocumentResult, ExtractionSchema, FieldValues};
pub use progress::{ProgressEvent, ProgressSink};
pub use rules::PatternLibrary;
pub use source::{FileTextSource, TextSource};
pub use store::{MemoryRuleStore, RuleAssignment, RuleStore, SqliteRuleStore};
