//! In-process rule cache, for tests and one-shot runs without persistence.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{Result, RuleAssignment, RuleRecord, RuleStore, RuleTransition};
use crate::error::StoreError;

/// Rule cache held in a map behind a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    entries: RwLock<BTreeMap<(String, String), RuleAssignment>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleStore for MemoryRuleStore {
    fn assignment(&self, label: &str, field: &str) -> Result<RuleAssignment> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries
            .get(&(label.to_string(), field.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn save_rule(&self, label: &str, field: &str, rule: &str) -> Result<RuleTransition> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let entry = entries
            .entry((label.to_string(), field.to_string()))
            .or_default();

        let (next, transition) = entry.observe(rule);
        *entry = next;
        Ok(transition)
    }

    fn records(&self) -> Result<Vec<RuleRecord>> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries
            .iter()
            .filter(|(_, assignment)| **assignment != RuleAssignment::Unassigned)
            .map(|((label, field), assignment)| RuleRecord {
                label: label.clone(),
                field: field.clone(),
                assignment: assignment.clone(),
                updated_at: None,
            })
            .collect())
    }
}
