//! Subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod process;
pub mod rules;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use regcache_core::models::config::RegcacheConfig;
use regcache_core::{
    LlmFallback, OpenAiClient, Orchestrator, RuleStore, SqliteRuleStore, TextSource,
};

/// Options accepted by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit config file.
    pub config: Option<PathBuf>,

    /// Rule cache override.
    pub db: Option<PathBuf>,
}

impl GlobalOptions {
    /// The config file in use: `--config` or the per-user default.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }

    /// Load the configuration.
    ///
    /// An explicit `--config` must exist; the per-user file is optional.
    pub fn load_config(&self) -> anyhow::Result<RegcacheConfig> {
        let path = self.config_path();
        if self.config.is_some() || path.exists() {
            debug!("Loading configuration from {}", path.display());
            Ok(RegcacheConfig::from_file(&path)?)
        } else {
            Ok(RegcacheConfig::default())
        }
    }

    /// Rule cache location: `--db` or `store.db_path`.
    pub fn db_path(&self, config: &RegcacheConfig) -> PathBuf {
        self.db
            .clone()
            .unwrap_or_else(|| config.store.db_path.clone())
    }

    /// Open (creating if needed) the rule cache.
    pub fn open_store(&self, config: &RegcacheConfig) -> anyhow::Result<SqliteRuleStore> {
        let path = self.db_path(config);
        debug!("Opening rule cache at {}", path.display());
        Ok(SqliteRuleStore::open(&path, config.store.busy_timeout())?)
    }
}

/// Per-user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("regcache")
        .join("config.json")
}

/// Wire an orchestrator from configuration.
///
/// Builds a blocking HTTP client, so it must run on a blocking thread.
pub fn build_orchestrator(
    config: &RegcacheConfig,
    store: Arc<dyn RuleStore>,
    source: Box<dyn TextSource>,
) -> anyhow::Result<Orchestrator> {
    let patterns = config.patterns.build_library()?;
    let client = OpenAiClient::from_config(&config.llm)?;
    debug!("Using model {} for fallback", client.model());

    Ok(Orchestrator::new(
        store,
        Arc::new(patterns),
        LlmFallback::new(Box::new(client)),
        source,
        config.extraction.clone(),
    ))
}
