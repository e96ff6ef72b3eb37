//! Reconciliation of a provider vocabulary onto a canonical one.

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::cache::{SharedCache, lock};
use super::fallback::{FallbackMatcher, NoFallback};
use super::matching::{MatchMethod, MatchResult};
use crate::error::{MariscoError, Result};
use crate::table::{Table, Value};
use crate::vocab::{Vocabulary, VocabularyLoader, normalize_name};

/// Provider spelling → canonical name overrides.
pub type Fixes = IndexMap<String, String>;

/// Build a [`Fixes`] table from literal pairs.
pub fn fixes(pairs: &[(&str, &str)]) -> Fixes {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

/// Counters for the last `generate_lookup_table` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapStats {
    /// Results served from the cache.
    pub cache_hits: usize,
    /// Results computed by the matching strategies.
    pub fresh: usize,
    pub exact: usize,
    pub fixed: usize,
    pub fallback: usize,
    pub unmatched: usize,
}

/// Maps every distinct value of a provider vocabulary to a [`MatchResult`].
///
/// The output is keyed by `key_column`, while names for comparison come from
/// `match_column`. The two may differ: HELCOM sediment types are keyed by an
/// integer `SEDI` code but matched on their `SEDIMENT TYPE` label.
pub struct Remapper {
    provider: Table,
    vocabulary: Box<dyn VocabularyLoader>,
    key_column: String,
    match_column: String,
    cache_name: String,
    cache: SharedCache,
    fallback: Box<dyn FallbackMatcher>,
    stats: RemapStats,
    unmatched: Vec<String>,
}

impl Remapper {
    pub fn new(
        provider: Table,
        vocabulary: impl VocabularyLoader + 'static,
        key_column: impl Into<String>,
        match_column: impl Into<String>,
        cache_name: impl Into<String>,
        cache: SharedCache,
    ) -> Self {
        Self {
            provider,
            vocabulary: Box::new(vocabulary),
            key_column: key_column.into(),
            match_column: match_column.into(),
            cache_name: cache_name.into(),
            cache,
            fallback: Box::new(NoFallback),
            stats: RemapStats::default(),
            unmatched: Vec::new(),
        }
    }

    /// Remapper over a plain list of provider values (key and name are the
    /// same column).
    pub fn from_values(
        values: Vec<Value>,
        vocabulary: impl VocabularyLoader + 'static,
        cache_name: impl Into<String>,
        cache: SharedCache,
    ) -> Self {
        let provider = Table::from_rows(["value"], values.into_iter().map(|v| vec![v]).collect());
        Self::new(provider, vocabulary, "value", "value", cache_name, cache)
    }

    /// Use `fallback` when exact and fixed matching fail.
    pub fn with_fallback(mut self, fallback: impl FallbackMatcher + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn stats(&self) -> &RemapStats {
        &self.stats
    }

    /// Provider values the last run could not resolve, for manual curation.
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    /// Resolve every distinct provider key.
    ///
    /// With `overwrite` false, cached results are returned unchanged and the
    /// canonical vocabulary is only loaded if at least one key is not cached.
    /// Fresh results are written back to the cache.
    pub fn generate_lookup_table(
        &mut self,
        fixes: &Fixes,
        overwrite: bool,
    ) -> Result<IndexMap<String, MatchResult>> {
        let key_idx = self.provider_column(&self.key_column)?;
        let match_idx = self.provider_column(&self.match_column)?;

        self.stats = RemapStats::default();
        self.unmatched.clear();

        let normalized_fixes: IndexMap<String, &String> = fixes
            .iter()
            .map(|(from, to)| (normalize_name(from), to))
            .collect();

        let mut vocabulary: Option<Vocabulary> = None;
        let mut lookup = IndexMap::new();
        let mut cache = lock(&self.cache)?;

        for row in &self.provider.rows {
            let key_value = &row[key_idx];
            if key_value.is_missing() {
                continue;
            }
            let key = key_value.key();
            if lookup.contains_key(&key) {
                continue;
            }

            if !overwrite {
                if let Some(hit) = cache.get(&self.cache_name, &key) {
                    self.stats.cache_hits += 1;
                    lookup.insert(key, hit);
                    continue;
                }
            }

            if vocabulary.is_none() {
                vocabulary = Some(self.vocabulary.load()?);
            }
            let Some(vocab) = vocabulary.as_ref() else {
                continue;
            };

            let name = row[match_idx].key();
            let result = resolve(&name, vocab, fixes, &normalized_fixes, self.fallback.as_ref());
            self.stats.fresh += 1;
            match result.method {
                MatchMethod::Exact => self.stats.exact += 1,
                MatchMethod::Fixed => self.stats.fixed += 1,
                MatchMethod::Fallback => self.stats.fallback += 1,
                MatchMethod::Unmatched => {
                    self.stats.unmatched += 1;
                    warn!(
                        cache = %self.cache_name,
                        provider_value = %name,
                        "No canonical match; add a fix for manual curation"
                    );
                    self.unmatched.push(name.clone());
                }
            }

            cache.put(&self.cache_name, &key, result.clone());
            lookup.insert(key, result);
        }

        if self.stats.fresh > 0 {
            cache.flush(&self.cache_name)?;
        }

        info!(
            cache = %self.cache_name,
            vocabulary = %self.vocabulary.name(),
            entries = lookup.len(),
            hits = self.stats.cache_hits,
            fresh = self.stats.fresh,
            unmatched = self.stats.unmatched,
            "Generated lookup table"
        );
        Ok(lookup)
    }

    fn provider_column(&self, name: &str) -> Result<usize> {
        self.provider
            .column_index(name)
            .ok_or_else(|| MariscoError::MissingColumn {
                column: name.to_string(),
                group: format!("provider vocabulary '{}'", self.cache_name),
            })
    }
}

/// Run the exact → fixed → fallback chain for one provider name.
fn resolve(
    name: &str,
    vocab: &Vocabulary,
    fixes: &Fixes,
    normalized_fixes: &IndexMap<String, &String>,
    fallback: &dyn FallbackMatcher,
) -> MatchResult {
    if let Some(entry) = vocab.lookup(name) {
        return MatchResult::matched(entry, name, MatchMethod::Exact);
    }

    let fix = fixes
        .get(name)
        .or_else(|| normalized_fixes.get(&normalize_name(name)).copied());
    if let Some(target) = fix {
        match vocab.lookup(target) {
            Some(entry) => return MatchResult::matched(entry, name, MatchMethod::Fixed),
            None => debug!(
                provider_value = name,
                fix = %target,
                "Fix target is not in the canonical vocabulary"
            ),
        }
    }

    let candidate = fix.map(String::as_str).unwrap_or(name);
    if let Some(entry) = fallback.best_match(candidate, vocab) {
        return MatchResult::matched(&entry, name, MatchMethod::Fallback);
    }

    MatchResult::unmatched(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remap::{FuzzyNameMatcher, MemoryCache, shared};
    use crate::vocab::{StaticVocabulary, UNMATCHED_ID};

    fn nuclides() -> StaticVocabulary {
        StaticVocabulary::from_pairs(
            "nuclides",
            &[(0, "NOT AVAILABLE"), (4, "k40"), (33, "cs137"), (34, "cs134_137_tot")],
        )
    }

    fn provider() -> Vec<Value> {
        ["cs137", "CS137 ", "k-40", "cs134137", "xx999", "cs137"]
            .iter()
            .map(|s| Value::text(*s))
            .collect()
    }

    #[test]
    fn test_strategies() {
        let cache = shared(MemoryCache::new());
        let mut remapper = Remapper::from_values(provider(), nuclides(), "nuclides", cache);
        let lut = remapper
            .generate_lookup_table(&fixes(&[("k-40", "k40"), ("cs134137", "cs134_137_tot")]), false)
            .unwrap();

        assert_eq!(lut.len(), 5);
        assert_eq!(lut["cs137"].method, MatchMethod::Exact);
        assert_eq!(lut["CS137 "].matched_id, 33);
        assert_eq!(lut["k-40"].method, MatchMethod::Fixed);
        assert_eq!(lut["k-40"].matched_id, 4);
        assert_eq!(lut["cs134137"].matched_name.as_deref(), Some("cs134_137_tot"));
        assert_eq!(lut["xx999"].matched_id, UNMATCHED_ID);
        assert_eq!(remapper.unmatched(), &["xx999".to_string()]);
    }

    #[test]
    fn test_second_call_is_pure_cache_read() {
        let cache = shared(MemoryCache::new());
        let mut remapper = Remapper::from_values(provider(), nuclides(), "nuclides", cache);
        let first = remapper.generate_lookup_table(&Fixes::new(), false).unwrap();
        assert_eq!(remapper.stats().fresh, 5);

        let second = remapper.generate_lookup_table(&Fixes::new(), false).unwrap();
        assert_eq!(remapper.stats().fresh, 0);
        assert_eq!(remapper.stats().cache_hits, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_overwrite_recomputes() {
        let cache = shared(MemoryCache::new());
        let mut remapper = Remapper::from_values(provider(), nuclides(), "nuclides", cache);
        remapper.generate_lookup_table(&Fixes::new(), false).unwrap();
        let lut = remapper
            .generate_lookup_table(&fixes(&[("k-40", "k40")]), true)
            .unwrap();
        assert_eq!(remapper.stats().cache_hits, 0);
        assert_eq!(lut["k-40"].method, MatchMethod::Fixed);
    }

    #[test]
    fn test_fallback_used_after_fixes() {
        let cache = shared(MemoryCache::new());
        let mut remapper = Remapper::from_values(vec![Value::text("cs-137")], nuclides(), "n", cache)
            .with_fallback(FuzzyNameMatcher::new(1));
        let lut = remapper.generate_lookup_table(&Fixes::new(), false).unwrap();
        assert_eq!(lut["cs-137"].method, MatchMethod::Fallback);
        assert_eq!(lut["cs-137"].matched_id, 33);
    }

    #[test]
    fn test_numeric_key_matched_by_name_column() {
        let sediments = StaticVocabulary::from_pairs(
            "sediments",
            &[(0, "(Not available)"), (2, "Sand"), (5, "Mud")],
        );
        let provider = Table::from_rows(
            ["SEDI", "SEDIMENT TYPE"],
            vec![
                vec![Value::Number(56.0), "NO DATA".into()],
                vec![Value::Number(1.0), "SAND".into()],
                vec![Value::Number(2.0), "mud ".into()],
            ],
        );
        let cache = shared(MemoryCache::new());
        let mut remapper =
            Remapper::new(provider, sediments, "SEDI", "SEDIMENT TYPE", "sediments", cache);
        let lut = remapper
            .generate_lookup_table(&fixes(&[("NO DATA", "(Not available)")]), false)
            .unwrap();

        assert_eq!(lut["1"].matched_id, 2);
        assert_eq!(lut["2"].matched_id, 5);
        assert_eq!(lut["56"].matched_id, 0);
        assert_eq!(lut["56"].method, MatchMethod::Fixed);
    }

    #[test]
    fn test_missing_provider_column() {
        let cache = shared(MemoryCache::new());
        let mut remapper = Remapper::new(Table::empty(), nuclides(), "RUBIN", "NAME", "x", cache);
        assert!(matches!(
            remapper.generate_lookup_table(&Fixes::new(), false),
            Err(MariscoError::MissingColumn { .. })
        ));
    }
}
