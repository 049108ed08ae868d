//! Heuristic pass: resolve fields from cached rules.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, trace};

use crate::models::config::TieBreak;
use crate::models::document::ExtractionSchema;
use crate::rules::PatternLibrary;
use crate::store::{self, RuleAssignment, RuleStore};

/// Outcome of the heuristic pass for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Field -> value found by a cached rule.
    pub resolved: BTreeMap<String, String>,

    /// Field -> description, to be sent to the LLM.
    pub unresolved: ExtractionSchema,
}

/// Resolves schema fields by applying the cached rule of each
/// (label, field) key to the whitespace tokens of the document text.
///
/// Fields are independent of each other: a resolved field never affects how
/// another one is resolved.
pub struct FieldResolver<'a> {
    store: &'a dyn RuleStore,
    patterns: &'a PatternLibrary,
    tie_break: TieBreak,
}

impl<'a> FieldResolver<'a> {
    pub fn new(store: &'a dyn RuleStore, patterns: &'a PatternLibrary, tie_break: TieBreak) -> Self {
        Self {
            store,
            patterns,
            tie_break,
        }
    }

    /// Split `schema` into resolved and unresolved fields.
    pub fn resolve<R: Rng>(
        &self,
        label: &str,
        schema: &ExtractionSchema,
        text: &str,
        rng: &mut R,
    ) -> store::Result<Resolution> {
        let mut resolution = Resolution::default();

        for (field, description) in schema {
            match self.resolve_field(label, field, text, rng)? {
                Some(value) => {
                    resolution.resolved.insert(field.clone(), value);
                }
                None => {
                    resolution.unresolved.insert(field.clone(), description.clone());
                }
            }
        }

        debug!(
            label,
            resolved = resolution.resolved.len(),
            unresolved = resolution.unresolved.len(),
            "heuristic pass done"
        );
        Ok(resolution)
    }

    /// Resolve a single field, `None` when it has to go to the LLM.
    pub fn resolve_field<R: Rng>(
        &self,
        label: &str,
        field: &str,
        text: &str,
        rng: &mut R,
    ) -> store::Result<Option<String>> {
        let rule = match self.store.assignment(label, field)? {
            RuleAssignment::Active(rule) => rule,
            RuleAssignment::Conflicting => {
                trace!(label, field, "conflicting key, skipping heuristics");
                return Ok(None);
            }
            RuleAssignment::Unassigned => return Ok(None),
        };

        if !self.patterns.contains(&rule) {
            debug!(label, field, rule = %rule, "cached rule is not registered");
            return Ok(None);
        }

        let candidates = self.matching_tokens(&rule, text);
        let value = match (candidates.len(), self.tie_break) {
            (0, _) => None,
            (1, _) | (_, TieBreak::First) => Some(candidates[0]),
            (n, TieBreak::Random) => Some(candidates[rng.random_range(0..n)]),
        };

        match value {
            Some(value) => {
                debug!(label, field, rule = %rule, candidates = candidates.len(), value, "field resolved");
                Ok(Some(value.to_string()))
            }
            None => {
                debug!(label, field, rule = %rule, "rule found no token");
                Ok(None)
            }
        }
    }

    /// Distinct whitespace tokens fully matching `rule`, in reading order.
    fn matching_tokens<'t>(&self, rule: &str, text: &'t str) -> Vec<&'t str> {
        let mut tokens: Vec<&str> = Vec::new();
        for token in text.split_whitespace() {
            if self.patterns.matches(rule, token) && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        tokens
    }
}
