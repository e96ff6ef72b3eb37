//! Fallback matchers, tried after exact and fixed matching fail.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{MariscoError, Result};
use crate::vocab::{Vocabulary, VocabularyEntry, is_sentinel, normalize_name};

/// Best-effort resolution strategy for one vocabulary domain.
pub trait FallbackMatcher {
    /// Short identifier used in diagnostics.
    fn name(&self) -> &str;

    /// Resolve `name` to a canonical entry, or `None`. Implementations must
    /// not fail: any internal error degrades to `None`.
    fn best_match(&self, name: &str, vocabulary: &Vocabulary) -> Option<VocabularyEntry>;
}

impl<F: FallbackMatcher + ?Sized> FallbackMatcher for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn best_match(&self, name: &str, vocabulary: &Vocabulary) -> Option<VocabularyEntry> {
        (**self).best_match(name, vocabulary)
    }
}

/// Never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackMatcher for NoFallback {
    fn name(&self) -> &str {
        "none"
    }

    fn best_match(&self, _name: &str, _vocabulary: &Vocabulary) -> Option<VocabularyEntry> {
        None
    }
}

/// Closest canonical name by edit distance.
#[derive(Debug, Clone)]
pub struct FuzzyNameMatcher {
    max_distance: usize,
}

impl FuzzyNameMatcher {
    pub fn new(max_distance: usize) -> Self {
        Self { max_distance }
    }
}

impl Default for FuzzyNameMatcher {
    fn default() -> Self {
        Self::new(3)
    }
}

impl FallbackMatcher for FuzzyNameMatcher {
    fn name(&self) -> &str {
        "fuzzy"
    }

    fn best_match(&self, name: &str, vocabulary: &Vocabulary) -> Option<VocabularyEntry> {
        let needle = normalize_name(name);
        if needle.is_empty() {
            return None;
        }

        // Ties go to the lower id.
        let mut best: Option<(&VocabularyEntry, usize)> = None;
        for entry in vocabulary.entries().iter().filter(|e| !is_sentinel(e.id)) {
            let distance = levenshtein(&needle, &normalize_name(&entry.name));
            if distance > self.max_distance {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, best_dist)) => {
                    distance < best_dist || (distance == best_dist && entry.id < current.id)
                }
            };
            if better {
                best = Some((entry, distance));
            }
        }

        best.map(|(entry, distance)| {
            debug!(provider_name = name, matched = %entry.name, distance, "Fuzzy fallback match");
            entry.clone()
        })
    }
}

/// WoRMS REST endpoint for name matching.
const WORMS_MATCH_URL: &str = "https://www.marinespecies.org/rest/AphiaRecordsByMatchNames";

/// Default request timeout for taxonomic lookups.
pub const DEFAULT_WORMS_TIMEOUT: Duration = Duration::from_secs(10);

/// Taxonomic fallback through the World Register of Marine Species.
///
/// The accepted name returned by WoRMS is looked up in the canonical
/// vocabulary; transport errors, timeouts, and unknown names all yield
/// `None`.
pub struct WormsMatcher {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct AphiaRecord {
    scientificname: Option<String>,
    valid_name: Option<String>,
    match_type: Option<String>,
}

impl WormsMatcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_WORMS_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MariscoError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: WORMS_MATCH_URL.to_string(),
        })
    }

    /// Point the matcher at another endpoint (mirrors, tests).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn query(&self, name: &str) -> Result<Vec<AphiaRecord>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("scientificnames[]", name), ("marine_only", "true")])
            .send()
            .map_err(|e| MariscoError::Http(format!("WoRMS request failed: {}", e)))?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(MariscoError::Http(format!(
                "WoRMS error ({})",
                response.status()
            )));
        }

        let batches: Vec<Option<Vec<AphiaRecord>>> = response
            .json()
            .map_err(|e| MariscoError::Http(format!("Failed to parse WoRMS response: {}", e)))?;
        Ok(batches.into_iter().flatten().flatten().collect())
    }
}

impl FallbackMatcher for WormsMatcher {
    fn name(&self) -> &str {
        "worms"
    }

    fn best_match(&self, name: &str, vocabulary: &Vocabulary) -> Option<VocabularyEntry> {
        let records = match self.query(name) {
            Ok(records) => records,
            Err(e) => {
                warn!(provider_name = name, error = %e, "WoRMS lookup failed, treating as no match");
                return None;
            }
        };

        records.iter().find_map(|record| {
            debug!(provider_name = name, match_type = ?record.match_type, "WoRMS candidate");
            [record.valid_name.as_deref(), record.scientificname.as_deref()]
                .into_iter()
                .flatten()
                .find_map(|candidate| vocabulary.lookup(candidate).cloned())
        })
    }
}

/// Calculate Levenshtein distance between two strings.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0usize; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
