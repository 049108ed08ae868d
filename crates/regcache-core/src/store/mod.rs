//! Persistent (label, field) rule cache.
//!
//! Each key is in exactly one of three states:
//!
//! ```text
//! Unassigned --unique r--> Active(r)
//! Active(r)  --unique r--> Active(r)
//! Active(r)  --unique r' != r--> Conflicting
//! Conflicting --any--> Conflicting
//! ```
//!
//! `Conflicting` is absorbing: a key that ever saw two different rules is
//! routed to the LLM forever.

mod memory;
mod sqlite;

pub use memory::MemoryRuleStore;
pub use sqlite::SqliteRuleStore;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Cached state of one (label, field) key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "rule", rename_all = "snake_case")]
pub enum RuleAssignment {
    /// Nothing learned yet.
    #[default]
    Unassigned,
    /// A single rule believed to extract this field reliably.
    Active(String),
    /// Two different rules were derived; heuristics are disabled.
    Conflicting,
}

/// What a `save_rule` call did to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTransition {
    /// Unassigned -> Active.
    Assigned,
    /// Active(r) observed r again.
    Unchanged,
    /// Active(previous) observed a different rule and became Conflicting.
    Conflicted { previous: String },
    /// The key was already Conflicting.
    Ignored,
}

impl RuleAssignment {
    /// Apply one observation of `rule` and return the next state.
    pub fn observe(&self, rule: &str) -> (RuleAssignment, RuleTransition) {
        match self {
            Self::Unassigned => (Self::Active(rule.to_string()), RuleTransition::Assigned),
            Self::Active(current) if current == rule => (self.clone(), RuleTransition::Unchanged),
            Self::Active(current) => (
                Self::Conflicting,
                RuleTransition::Conflicted {
                    previous: current.clone(),
                },
            ),
            Self::Conflicting => (Self::Conflicting, RuleTransition::Ignored),
        }
    }

    /// The active rule name, if any.
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::Active(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn is_conflicting(&self) -> bool {
        matches!(self, Self::Conflicting)
    }
}

/// One persisted key, for listing the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub label: String,
    pub field: String,
    pub assignment: RuleAssignment,
    /// RFC 3339 timestamp of the last write, when the backend tracks it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Durable rule cache shared by every orchestrator of a deployment.
///
/// Implementations must run the read-compare-write of [`save_rule`] as one
/// atomic unit per key, and reads must never observe a half-applied save.
///
/// [`save_rule`]: RuleStore::save_rule
pub trait RuleStore: Send + Sync {
    /// Read the full state of a key.
    fn assignment(&self, label: &str, field: &str) -> Result<RuleAssignment>;

    /// Record that `rule` uniquely matched an observed value for the key.
    fn save_rule(&self, label: &str, field: &str, rule: &str) -> Result<RuleTransition>;

    /// Every non-unassigned key, ordered by label then field.
    fn records(&self) -> Result<Vec<RuleRecord>>;

    /// The active rule for a key. Always `None` for a conflicting key.
    fn get_rule(&self, label: &str, field: &str) -> Result<Option<String>> {
        Ok(self.assignment(label, field)?.rule().map(str::to_string))
    }

    /// Whether the key has been marked conflicting.
    fn is_conflicting(&self, label: &str, field: &str) -> Result<bool> {
        Ok(self.assignment(label, field)?.is_conflicting())
    }
}
