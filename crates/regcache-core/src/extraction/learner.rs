//! Learning pass: turn LLM answers into cached rules.

use tracing::{debug, info};

use crate::rules::PatternLibrary;
use crate::store::{self, RuleStore, RuleTransition};

/// Counters for one learning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearningReport {
    /// Keys that got their first rule.
    pub learned: usize,
    /// Keys that saw their current rule again.
    pub confirmed: usize,
    /// Keys that became conflicting.
    pub conflicts: usize,
    /// Observations on keys that were already conflicting.
    pub ignored: usize,
    /// Values matching more than one pattern.
    pub ambiguous: usize,
    /// Values matching no pattern.
    pub unmatched: usize,
}

/// Observes LLM-extracted values and records uniquely matching rules.
pub struct LearningEngine<'a> {
    store: &'a dyn RuleStore,
    patterns: &'a PatternLibrary,
}

impl<'a> LearningEngine<'a> {
    pub fn new(store: &'a dyn RuleStore, patterns: &'a PatternLibrary) -> Self {
        Self { store, patterns }
    }

    /// Learn from `(field, value)` pairs answered by the LLM for `label`.
    ///
    /// Empty and missing values are skipped. A value matching zero or several
    /// patterns never reaches the store.
    pub fn learn<'v, I>(&self, label: &str, answers: I) -> store::Result<LearningReport>
    where
        I: IntoIterator<Item = (&'v str, Option<&'v str>)>,
    {
        let mut report = LearningReport::default();

        for (field, value) in answers {
            let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };

            let Some(rule) = self.patterns.find_unique_rule(value) else {
                if self.patterns.matching_rules(value).is_empty() {
                    report.unmatched += 1;
                } else {
                    debug!(label, field, value, "ambiguous value, not learning");
                    report.ambiguous += 1;
                }
                continue;
            };

            match self.store.save_rule(label, field, rule)? {
                RuleTransition::Assigned => {
                    info!(label, field, rule, "learned rule");
                    report.learned += 1;
                }
                RuleTransition::Unchanged => report.confirmed += 1,
                RuleTransition::Conflicted { previous } => {
                    info!(label, field, previous = %previous, rule, "rule conflict, key disabled");
                    report.conflicts += 1;
                }
                RuleTransition::Ignored => report.ignored += 1,
            }
        }

        Ok(report)
    }
}
