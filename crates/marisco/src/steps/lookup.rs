//! Lookup tables consumed by the remapping steps.

use indexmap::IndexMap;

use crate::error::Result;
use crate::remap::{Fixes, MatchResult, Remapper};
use crate::table::Table;
use crate::vocab::VocabularyLoader;

/// Provider key → match, as produced by a [`Remapper`].
pub type Lookup = IndexMap<String, MatchResult>;

/// Provider key → canonical id.
pub type IdLookup = IndexMap<String, i64>;

/// Canonical ids of a remapper lookup.
pub fn match_ids(lookup: &Lookup) -> IdLookup {
    lookup
        .iter()
        .map(|(key, result)| (key.clone(), result.matched_id))
        .collect()
}

/// Something that can produce a code → id table when a step runs.
pub trait IdLookupSource {
    /// Short description for the transformation log.
    fn describe(&self) -> String;

    fn load(&mut self) -> Result<IdLookup>;
}

/// A lookup built by running a [`Remapper`].
pub struct RemapperLookup {
    remapper: Remapper,
    fixes: Fixes,
    overwrite: bool,
}

impl RemapperLookup {
    pub fn new(remapper: Remapper, fixes: Fixes) -> Self {
        Self {
            remapper,
            fixes,
            overwrite: false,
        }
    }

    /// Recompute every match instead of reading the cache.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl IdLookupSource for RemapperLookup {
    fn describe(&self) -> String {
        self.remapper.cache_name().to_string()
    }

    fn load(&mut self) -> Result<IdLookup> {
        let lookup = self
            .remapper
            .generate_lookup_table(&self.fixes, self.overwrite)?;
        Ok(match_ids(&lookup))
    }
}

/// Canonical id → integer attribute of the same vocabulary (for example
/// `species_id` → `biogroup_id`).
pub struct AttributeLookup {
    vocabulary: Box<dyn VocabularyLoader>,
    attribute: String,
}

impl AttributeLookup {
    pub fn new(vocabulary: impl VocabularyLoader + 'static, attribute: impl Into<String>) -> Self {
        Self {
            vocabulary: Box::new(vocabulary),
            attribute: attribute.into(),
        }
    }
}

impl IdLookupSource for AttributeLookup {
    fn describe(&self) -> String {
        format!("{}.{}", self.vocabulary.name(), self.attribute)
    }

    fn load(&mut self) -> Result<IdLookup> {
        let vocabulary = self.vocabulary.load()?;
        Ok(vocabulary
            .entries()
            .iter()
            .filter_map(|entry| {
                let value = entry.attribute(&self.attribute)?;
                let id = value.trim().parse::<f64>().ok()?;
                Some((entry.id.to_string(), id as i64))
            })
            .collect())
    }
}

/// A fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup(pub IdLookup);

impl StaticLookup {
    pub fn from_pairs(pairs: &[(&str, i64)]) -> Self {
        Self(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }
}

impl IdLookupSource for StaticLookup {
    fn describe(&self) -> String {
        "static table".to_string()
    }

    fn load(&mut self) -> Result<IdLookup> {
        Ok(self.0.clone())
    }
}

/// Two-column text lookup from a provider table (for example `METHOD` →
/// `DESCRIPTION`). Rows with a missing key or value are skipped.
pub fn text_lookup(table: &Table, key: &str, value: &str) -> IndexMap<String, String> {
    let (Some(k), Some(v)) = (table.column_index(key), table.column_index(value)) else {
        return IndexMap::new();
    };
    table
        .rows
        .iter()
        .filter(|row| !row[k].is_missing() && !row[v].is_missing())
        .map(|row| (row[k].key(), row[v].key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use crate::vocab::{StaticVocabulary, VocabularyEntry};

    #[test]
    fn test_attribute_lookup() {
        let species = StaticVocabulary::new(
            "species",
            vec![
                VocabularyEntry::new(99, "Gadus morhua").with_attribute("biogroup_id", "4"),
                VocabularyEntry::new(100, "Unknown fish"),
            ],
        );
        let mut lookup = AttributeLookup::new(species, "biogroup_id");
        let ids = lookup.load().unwrap();
        assert_eq!(ids.get("99"), Some(&4));
        assert!(!ids.contains_key("100"));
    }

    #[test]
    fn test_text_lookup_skips_missing() {
        let table = Table::from_rows(
            ["METHOD", "DESCRIPTION"],
            vec![
                vec!["BFFG01".into(), "Gammaspectrometric analysis".into()],
                vec!["XX".into(), Value::Missing],
            ],
        );
        let lut = text_lookup(&table, "METHOD", "DESCRIPTION");
        assert_eq!(lut.len(), 1);
        assert_eq!(lut["BFFG01"], "Gammaspectrometric analysis");
    }
}
