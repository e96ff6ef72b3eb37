//! Canonical (MARIS) vocabularies and their loaders.
//!
//! A vocabulary is a list of `(id, name, attributes)` entries. The Remapper
//! only needs name lookups and id lookups, so a vocabulary can come from a
//! CSV export of the MARIS lookup tables or from a code-based registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MariscoError, Result};
use crate::input::Parser;
use crate::table::Value;

/// Reserved id meaning "not available" in MARIS lookup tables.
pub const NOT_AVAILABLE_ID: i64 = 0;

/// Reserved id meaning "no reliable match found".
pub const UNMATCHED_ID: i64 = -1;

/// Whether `id` is one of the reserved sentinel ids.
pub fn is_sentinel(id: i64) -> bool {
    id == NOT_AVAILABLE_ID || id == UNMATCHED_ID
}

/// One canonical entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: i64,
    pub name: String,
    /// Extra attributes such as taxonomic rank or bio group id.
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl VocabularyEntry {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Normalize a name for comparison: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A loaded canonical vocabulary with name and id indexes.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entries: Vec<VocabularyEntry>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<i64, usize>,
}

impl Vocabulary {
    /// Build a vocabulary. On duplicate normalized names the first entry
    /// wins.
    pub fn new(entries: Vec<VocabularyEntry>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            by_name.entry(normalize_name(&entry.name)).or_insert(i);
            by_id.entry(entry.id).or_insert(i);
        }
        Self {
            entries,
            by_name,
            by_id,
        }
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup on the normalized name.
    pub fn lookup(&self, name: &str) -> Option<&VocabularyEntry> {
        self.by_name
            .get(&normalize_name(name))
            .map(|&i| &self.entries[i])
    }

    pub fn by_id(&self, id: i64) -> Option<&VocabularyEntry> {
        self.by_id.get(&id).map(|&i| &self.entries[i])
    }

    /// `name -> id` map, the shape used by simple code lookups.
    pub fn name_to_id(&self) -> HashMap<String, i64> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.id))
            .collect()
    }

    /// `id -> attribute` map for one attribute column.
    pub fn attribute_by_id(&self, attribute: &str) -> HashMap<i64, String> {
        self.entries
            .iter()
            .filter_map(|e| e.attribute(attribute).map(|v| (e.id, v.to_string())))
            .collect()
    }
}

/// Source of a canonical vocabulary.
pub trait VocabularyLoader {
    /// Short identifier used in diagnostics.
    fn name(&self) -> &str;

    fn load(&self) -> Result<Vocabulary>;
}

/// Vocabulary read from a CSV export of a MARIS lookup table.
///
/// Columns other than the id and name columns become attributes.
#[derive(Debug, Clone)]
pub struct CsvVocabulary {
    path: PathBuf,
    id_column: String,
    name_column: String,
}

impl CsvVocabulary {
    pub fn new(
        path: impl Into<PathBuf>,
        id_column: impl Into<String>,
        name_column: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            id_column: id_column.into(),
            name_column: name_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VocabularyLoader for CsvVocabulary {
    fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("vocabulary")
    }

    fn load(&self) -> Result<Vocabulary> {
        let (table, _) = Parser::new().parse_file(&self.path)?;
        let id_idx = table.column_index(&self.id_column).ok_or_else(|| {
            MariscoError::Config(format!(
                "Vocabulary '{}' has no id column '{}'",
                self.path.display(),
                self.id_column
            ))
        })?;
        let name_idx = table.column_index(&self.name_column).ok_or_else(|| {
            MariscoError::Config(format!(
                "Vocabulary '{}' has no name column '{}'",
                self.path.display(),
                self.name_column
            ))
        })?;

        let entries = table
            .rows
            .iter()
            .filter_map(|row| {
                let id = row[id_idx].as_i64()?;
                let name = match &row[name_idx] {
                    Value::Missing => return None,
                    other => other.key(),
                };
                let mut entry = VocabularyEntry::new(id, name);
                for (i, col) in table.columns.iter().enumerate() {
                    if i != id_idx && i != name_idx && !row[i].is_missing() {
                        entry.attributes.insert(col.clone(), row[i].key());
                    }
                }
                Some(entry)
            })
            .collect();

        Ok(Vocabulary::new(entries))
    }
}

/// Code-based vocabulary registry.
#[derive(Debug, Clone)]
pub struct StaticVocabulary {
    name: String,
    entries: Vec<VocabularyEntry>,
}

impl StaticVocabulary {
    pub fn new(name: impl Into<String>, entries: Vec<VocabularyEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Build from `(id, name)` pairs.
    pub fn from_pairs(name: impl Into<String>, pairs: &[(i64, &str)]) -> Self {
        Self::new(
            name,
            pairs
                .iter()
                .map(|(id, n)| VocabularyEntry::new(*id, *n))
                .collect(),
        )
    }
}

impl VocabularyLoader for StaticVocabulary {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vocabulary> {
        Ok(Vocabulary::new(self.entries.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lookup_is_case_and_space_insensitive() {
        let vocab = Vocabulary::new(vec![
            VocabularyEntry::new(33, "cs137"),
            VocabularyEntry::new(4, "k40"),
        ]);
        assert_eq!(vocab.lookup("  CS137 ").map(|e| e.id), Some(33));
        assert!(vocab.lookup("cs-137").is_none());
        assert_eq!(vocab.by_id(4).map(|e| e.name.as_str()), Some("k40"));
    }

    #[test]
    fn test_csv_vocabulary_attributes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dbo_species.csv");
        fs::write(
            &path,
            "species_id,species,biogroup_id,Taxonrank\n\
             99,Gadus morhua,4,species\n\
             0,(Not available),,\n",
        )
        .unwrap();

        let loader = CsvVocabulary::new(&path, "species_id", "species");
        assert_eq!(loader.name(), "dbo_species");

        let vocab = loader.load().unwrap();
        assert_eq!(vocab.len(), 2);
        let cod = vocab.lookup("gadus morhua").unwrap();
        assert_eq!(cod.attribute("biogroup_id"), Some("4"));
        assert_eq!(vocab.attribute_by_id("Taxonrank").get(&99).map(String::as_str), Some("species"));
        assert!(vocab.by_id(NOT_AVAILABLE_ID).unwrap().attributes.is_empty());
    }

    #[test]
    fn test_missing_id_column_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("units.csv");
        fs::write(&path, "unit,name\n1,Bq/m3\n").unwrap();
        let err = CsvVocabulary::new(&path, "unit_id", "name").load().unwrap_err();
        assert!(matches!(err, MariscoError::Config(_)));
    }
}
