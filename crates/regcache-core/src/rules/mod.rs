//! Named pattern registry used both to resolve fields and to learn rules.

pub mod patterns;

use std::collections::BTreeMap;

use regex::Regex;
use tracing::trace;

use crate::error::PatternError;

/// Registry of named whole-token patterns.
///
/// A rule name stored in the cache is only meaningful while it is registered
/// here; an unknown name never matches anything.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    patterns: BTreeMap<String, Regex>,
}

impl PatternLibrary {
    /// Create an empty library.
    pub fn empty() -> Self {
        Self {
            patterns: BTreeMap::new(),
        }
    }

    /// Create a library holding every built-in pattern.
    pub fn builtin() -> Self {
        let patterns = patterns::builtin_patterns()
            .into_iter()
            .map(|(name, regex)| (name.to_string(), regex.clone()))
            .collect();
        Self { patterns }
    }

    /// Register an extra pattern.
    ///
    /// The expression is wrapped in anchors so it can only match a whole token.
    pub fn register(&mut self, name: &str, pattern: &str) -> Result<(), PatternError> {
        if self.patterns.contains_key(name) {
            return Err(PatternError::Duplicate(name.to_string()));
        }

        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            PatternError::InvalidRegex {
                name: name.to_string(),
                source,
            }
        })?;

        self.patterns.insert(name.to_string(), regex);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_pattern(mut self, name: &str, pattern: &str) -> Result<Self, PatternError> {
        self.register(name, pattern)?;
        Ok(self)
    }

    /// Whether `name` is a registered rule.
    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True iff `candidate` matches the named pattern over its entire length.
    pub fn matches(&self, name: &str, candidate: &str) -> bool {
        self.patterns
            .get(name)
            .is_some_and(|regex| regex.is_match(candidate))
    }

    /// Find the single rule that matches `value`.
    ///
    /// Returns `None` when the value is empty, matches nothing, or matches
    /// more than one pattern. An ambiguous value cannot tell field types apart,
    /// so it must never become a learned rule.
    pub fn find_unique_rule(&self, value: &str) -> Option<&str> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let mut found: Option<&str> = None;
        for (name, regex) in &self.patterns {
            if regex.is_match(value) {
                if found.is_some() {
                    trace!(value, "value matches several patterns");
                    return None;
                }
                found = Some(name.as_str());
            }
        }
        found
    }

    /// Every rule matching `value`, for diagnostics.
    pub fn matching_rules(&self, value: &str) -> Vec<&str> {
        let value = value.trim();
        self.patterns
            .iter()
            .filter(|(_, regex)| !value.is_empty() && regex.is_match(value))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_whole_token_only() {
        let library = PatternLibrary::builtin();

        assert!(library.matches("DATA_BR", "04/02/2021"));
        assert!(!library.matches("DATA_BR", "x04/02/2021"));
        assert!(!library.matches("DATA_BR", "04/02/20211"));
        assert!(!library.matches("UNKNOWN", "04/02/2021"));
    }

    #[test]
    fn test_find_unique_rule() {
        let library = PatternLibrary::builtin();

        assert_eq!(library.find_unique_rule("04/02/2021"), Some("DATA_BR"));
        assert_eq!(library.find_unique_rule("2022-11-15"), Some("DATA_ISO"));
        assert_eq!(library.find_unique_rule("123.456.789-09"), Some("CPF"));
        assert_eq!(library.find_unique_rule("  15/11/2022 "), Some("DATA_BR"));
        assert_eq!(library.find_unique_rule("joao[at]example.com"), Some("EMAIL"));
        assert_eq!(library.find_unique_rule("CNH12345678901"), Some("CNH"));
    }

    #[test]
    fn test_find_unique_rule_rejects_empty_and_unmatched() {
        let library = PatternLibrary::builtin();

        assert_eq!(library.find_unique_rule(""), None);
        assert_eq!(library.find_unique_rule("   "), None);
        assert_eq!(library.find_unique_rule("Maria da Silva"), None);
    }

    #[test]
    fn test_find_unique_rule_rejects_ambiguous() {
        let library = PatternLibrary::builtin();

        // 8 digits: RG and CEP
        assert_eq!(library.matching_rules("12345678"), vec!["CEP", "RG"]);
        assert_eq!(library.find_unique_rule("12345678"), None);

        // single digit: N1 and LATLONG
        assert_eq!(library.find_unique_rule("7"), None);
    }

    #[test]
    fn test_register_custom_pattern() {
        let library = PatternLibrary::empty()
            .with_pattern("PLACA", r"[A-Z]{3}-?\d[A-Z0-9]\d{2}")
            .unwrap();

        assert!(library.matches("PLACA", "ABC1D23"));
        assert!(!library.matches("PLACA", "xABC1D23"));
        assert_eq!(library.find_unique_rule("ABC-1234"), Some("PLACA"));
    }

    #[test]
    fn test_register_rejects_duplicates_and_bad_regex() {
        let mut library = PatternLibrary::builtin();

        assert!(matches!(
            library.register("CPF", r"\d+"),
            Err(PatternError::Duplicate(_))
        ));
        assert!(matches!(
            library.register("BROKEN", r"(\d"),
            Err(PatternError::InvalidRegex { .. })
        ));
    }
}
