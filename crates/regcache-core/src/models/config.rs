//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PatternError, RegcacheError, Result};
use crate::rules::PatternLibrary;

/// Main configuration for the regcache pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegcacheConfig {
    /// Rule cache configuration.
    pub store: StoreConfig,

    /// LLM fallback configuration.
    pub llm: LlmConfig,

    /// Field resolution configuration.
    pub extraction: ExtractionConfig,

    /// Extra patterns registered after the built-ins.
    pub patterns: PatternConfig,
}

/// Rule cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,

    /// How long a writer waits for another process holding the database lock.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("template_cache.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// LLM fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API root.
    pub base_url: String,

    /// Chat model name.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-5-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

/// How to pick among several tokens matching a field's rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Uniform choice among the distinct matching tokens.
    #[default]
    Random,
    /// The first matching token in reading order.
    First,
}

/// Which value wins when both passes produce one for the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePrecedence {
    /// The LLM answer overrides the heuristic value.
    #[default]
    Llm,
    /// The heuristic value is kept.
    Heuristic,
}

/// Field resolution configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Tie-break among several matching tokens.
    pub tie_break: TieBreak,

    /// Seed for the tie-break randomness (random when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Merge precedence between heuristic and LLM values.
    pub merge_precedence: MergePrecedence,

    /// Null out fields whose name shares no word with the document text.
    pub prefilter_fields: bool,
}

/// Extra pattern definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Rule name -> regular expression (anchored automatically).
    pub custom: BTreeMap<String, String>,
}

impl PatternConfig {
    /// Built-in library extended with the custom patterns.
    pub fn build_library(&self) -> std::result::Result<PatternLibrary, PatternError> {
        let mut library = PatternLibrary::builtin();
        for (name, pattern) in &self.custom {
            library.register(name, pattern)?;
        }
        Ok(library)
    }
}

impl RegcacheConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegcacheError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RegcacheError::Config(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Look up a dotted key such as `extraction.tie_break`.
    pub fn get_path(&self, key: &str) -> Result<Value> {
        let json = serde_json::to_value(self)?;
        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part).ok_or_else(|| {
                RegcacheError::Config(format!("configuration key not found: {key}"))
            })?;
        }
        Ok(current.clone())
    }

    /// Set a dotted key, validating the result against the config schema.
    pub fn set_path(&mut self, key: &str, value: Value) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| RegcacheError::Config("empty configuration key".to_string()))?;

        let mut current = &mut json;
        for part in parents {
            current = current.get_mut(*part).ok_or_else(|| {
                RegcacheError::Config(format!("configuration path not found: {key}"))
            })?;
        }

        let object = current.as_object_mut().ok_or_else(|| {
            RegcacheError::Config(format!("cannot set value at non-object path: {key}"))
        })?;
        object.insert((*last).to_string(), value);

        *self = serde_json::from_value(json)
            .map_err(|e| RegcacheError::Config(format!("invalid value for {key}: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = RegcacheConfig::default();
        assert_eq!(config.store.db_path, PathBuf::from("template_cache.db"));
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.extraction.tie_break, TieBreak::Random);
        assert_eq!(config.extraction.merge_precedence, MergePrecedence::Llm);
        assert!(!config.extraction.prefilter_fields);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: RegcacheConfig = serde_json::from_value(json!({
            "extraction": { "tie_break": "first", "seed": 7 }
        }))
        .unwrap();

        assert_eq!(config.extraction.tie_break, TieBreak::First);
        assert_eq!(config.extraction.seed, Some(7));
        assert_eq!(config.llm.model, "gpt-5-mini");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RegcacheConfig::default();
        config.store.db_path = PathBuf::from("/tmp/rules.db");
        config.save(&path).unwrap();

        let loaded = RegcacheConfig::from_file(&path).unwrap();
        assert_eq!(loaded.store.db_path, PathBuf::from("/tmp/rules.db"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = RegcacheConfig::from_file(Path::new("/nonexistent/regcache.json")).unwrap_err();
        assert!(matches!(err, RegcacheError::Config(_)));
    }

    #[test]
    fn test_get_and_set_path() {
        let mut config = RegcacheConfig::default();

        assert_eq!(config.get_path("llm.model").unwrap(), json!("gpt-5-mini"));

        config
            .set_path("extraction.merge_precedence", json!("heuristic"))
            .unwrap();
        assert_eq!(config.extraction.merge_precedence, MergePrecedence::Heuristic);

        assert!(config.get_path("llm.nope").is_err());
        assert!(config.set_path("extraction.tie_break", json!("loudest")).is_err());
        // Failed set leaves the config untouched
        assert_eq!(config.extraction.tie_break, TieBreak::Random);
    }

    #[test]
    fn test_custom_patterns() {
        let mut config = PatternConfig::default();
        config
            .custom
            .insert("PLACA".to_string(), r"[A-Z]{3}\d[A-Z0-9]\d{2}".to_string());

        let library = config.build_library().unwrap();
        assert!(library.contains("PLACA"));
        assert!(library.contains("DATA_BR"));

        config.custom.insert("CPF".to_string(), r"\d+".to_string());
        assert!(config.build_library().is_err());
    }
}
