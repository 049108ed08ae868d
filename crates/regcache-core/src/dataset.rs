//! Dataset directory loading.
//!
//! A dataset directory holds a `dataset.json` array of
//! `{pdf_path, label, extraction_schema}` entries and a `files/` folder with
//! the documents.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DocumentError, RegcacheError, Result};
use crate::models::document::{DatasetEntry, ExtractionSchema};

/// Dataset description file name.
pub const DATASET_FILE: &str = "dataset.json";

/// Document folder name.
pub const FILES_DIR: &str = "files";

/// Entry as parsed, or why it was rejected.
pub type EntryResult = std::result::Result<DatasetEntry, DocumentError>;

/// A loaded dataset directory.
#[derive(Debug)]
pub struct Dataset {
    /// The dataset directory.
    pub root: PathBuf,

    /// Entries in file order. Malformed ones are kept as errors so the batch
    /// can report them at their position.
    pub entries: Vec<EntryResult>,
}

impl Dataset {
    /// Load `<dir>/dataset.json`.
    ///
    /// A missing directory, a missing or unparseable file, or a top level that
    /// is not an array are configuration errors.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(RegcacheError::Config(format!(
                "dataset directory not found: {}",
                dir.display()
            )));
        }

        let path = dir.join(DATASET_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            RegcacheError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let entries = parse_entries(&content)?;
        debug!(path = %path.display(), entries = entries.len(), "dataset loaded");

        Ok(Self {
            root: dir.to_path_buf(),
            entries,
        })
    }

    /// Directory holding the documents.
    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse the content of a dataset file.
pub fn parse_entries(content: &str) -> Result<Vec<EntryResult>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| RegcacheError::Config(format!("invalid dataset file: {e}")))?;

    let Value::Array(items) = value else {
        return Err(RegcacheError::Config(
            "dataset file must contain a JSON array".to_string(),
        ));
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let entry = parse_entry(index, item);
            if let Err(e) = &entry {
                warn!("{}", e);
            }
            entry
        })
        .collect())
}

fn parse_entry(index: usize, item: Value) -> EntryResult {
    let malformed = |reason: String| DocumentError::MalformedEntry { index, reason };

    let Value::Object(mut object) = item else {
        return Err(malformed("entry is not an object".to_string()));
    };

    let document = take_string(&mut object, "pdf_path")
        .ok_or_else(|| malformed("missing pdf_path".to_string()))?;
    let label =
        take_string(&mut object, "label").ok_or_else(|| malformed("missing label".to_string()))?;
    let schema = object
        .remove("extraction_schema")
        .ok_or_else(|| malformed("missing extraction_schema".to_string()))
        .and_then(|raw| parse_schema(raw).map_err(malformed))?;

    Ok(DatasetEntry {
        document,
        label,
        schema,
    })
}

fn take_string(object: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// Accepts a schema object or a string holding one.
pub fn parse_schema(raw: Value) -> std::result::Result<ExtractionSchema, String> {
    let object = match raw {
        Value::Object(object) => object,
        Value::String(encoded) => match serde_json::from_str(&encoded) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return Err("extraction_schema string does not encode an object".to_string()),
            Err(e) => return Err(format!("extraction_schema is not valid JSON: {e}")),
        },
        _ => return Err("extraction_schema must be an object".to_string()),
    };

    Ok(object
        .into_iter()
        .map(|(field, description)| {
            let description = match description {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (field, description)
        })
        .collect())
}
