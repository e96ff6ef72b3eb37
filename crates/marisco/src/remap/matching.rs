//! Outcome of reconciling one provider value.

use serde::{Deserialize, Serialize};

use crate::vocab::{UNMATCHED_ID, VocabularyEntry};

/// How a provider value was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// Normalized provider name equals a canonical name.
    Exact,
    /// Resolved through a caller-supplied spelling fix.
    Fixed,
    /// Resolved by the pluggable fallback matcher.
    Fallback,
    /// No strategy produced a match.
    Unmatched,
}

impl MatchMethod {
    pub fn label(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::Fixed => "fixed",
            MatchMethod::Fallback => "fallback",
            MatchMethod::Unmatched => "unmatched",
        }
    }
}

/// Immutable record of a single reconciliation outcome.
///
/// This is also the on-disk cache format (JSON object with these four
/// fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Canonical id, or [`UNMATCHED_ID`].
    pub matched_id: i64,
    /// Canonical name, absent when unmatched.
    pub matched_name: Option<String>,
    /// The provider value as it appeared in the source.
    pub source_value: String,
    pub method: MatchMethod,
}

impl MatchResult {
    pub fn matched(entry: &VocabularyEntry, source_value: impl Into<String>, method: MatchMethod) -> Self {
        Self {
            matched_id: entry.id,
            matched_name: Some(entry.name.clone()),
            source_value: source_value.into(),
            method,
        }
    }

    pub fn unmatched(source_value: impl Into<String>) -> Self {
        Self {
            matched_id: UNMATCHED_ID,
            matched_name: None,
            source_value: source_value.into(),
            method: MatchMethod::Unmatched,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.method != MatchMethod::Unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_form() {
        let entry = VocabularyEntry::new(33, "cs137");
        let result = MatchResult::matched(&entry, "CS137", MatchMethod::Exact);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"matched_id":33,"matched_name":"cs137","source_value":"CS137","method":"exact"}"#
        );
        let back: MatchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_unmatched_uses_sentinel() {
        let result = MatchResult::unmatched("xx999");
        assert_eq!(result.matched_id, UNMATCHED_ID);
        assert!(!result.is_matched());
        assert_eq!(result.matched_name, None);
    }
}
