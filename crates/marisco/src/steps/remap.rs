//! Code → canonical id remapping for species, body parts, bio groups and
//! sediment types.

use serde::{Deserialize, Serialize};

use super::lookup::{IdLookup, IdLookupSource};
use crate::error::Result;
use crate::pipeline::{StepContext, TransformStep};
use crate::table::{BIOTA, SEDIMENT, Value};
use crate::vocab::{NOT_AVAILABLE_ID, UNMATCHED_ID, VocabularyLoader, is_sentinel};

/// Map one lookup key to an id column value.
///
/// Sentinel ids pass through untouched and a missing source reads as
/// not available.
fn remap_value(value: &Value, lookup: &IdLookup) -> (Value, bool) {
    if value.is_missing() {
        return (Value::from(NOT_AVAILABLE_ID), true);
    }
    if let Some(id) = value.as_i64().filter(|id| is_sentinel(*id)) {
        return (Value::from(id), true);
    }
    match lookup.get(&value.key()) {
        Some(id) => (Value::from(*id), true),
        None => (Value::from(UNMATCHED_ID), false),
    }
}

/// Generic remapping of a source column into an id column.
pub struct Remap {
    source: Box<dyn IdLookupSource>,
    dest: String,
    src: String,
    groups: Vec<String>,
}

impl Remap {
    /// Remap `src` into `dest` in each of `groups`.
    pub fn new(
        source: impl IdLookupSource + 'static,
        dest: impl Into<String>,
        src: impl Into<String>,
        groups: &[&str],
    ) -> Self {
        Self {
            source: Box::new(source),
            dest: dest.into(),
            src: src.into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }
}

impl TransformStep for Remap {
    fn name(&self) -> &str {
        "Remap"
    }

    fn description(&self) -> String {
        format!(
            "Remap '{}' to '{}' using {}",
            self.src,
            self.dest,
            self.source.describe()
        )
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        for group in &self.groups {
            ctx.dataset.group(group, "Remap")?;
        }
        let lookup = self.source.load()?;

        let mut notes = Vec::new();
        for group in &self.groups {
            let table = ctx.dataset.group_mut(group, "Remap")?;
            let mut unmatched: Vec<String> = Vec::new();
            let found = table.map_column(&self.src, &self.dest, |v| {
                let (id, matched) = remap_value(v, &lookup);
                if !matched && !unmatched.contains(&v.key()) {
                    unmatched.push(v.key());
                }
                id
            });
            if !found {
                notes.push(format!("Group '{}' has no '{}' column", group, self.src));
            } else if !unmatched.is_empty() {
                notes.push(format!(
                    "Unmatched '{}' values in '{}': {}",
                    self.src,
                    group,
                    unmatched.join(", ")
                ));
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Taxonomic attributes copied from the species vocabulary.
pub const TAXON_COLUMNS: [&str; 5] = ["Taxonname", "Taxonrank", "TaxonDB", "TaxonDBID", "TaxonDBURL"];

/// Fill value for taxon attributes of unmatched species.
pub const UNKNOWN_TAXON: &str = "Unknown";

/// Add taxon name, rank and database references to biota from the
/// `species` id column.
pub struct RemapTaxonInformation {
    vocabulary: Box<dyn VocabularyLoader>,
}

impl RemapTaxonInformation {
    pub fn new(vocabulary: impl VocabularyLoader + 'static) -> Self {
        Self {
            vocabulary: Box::new(vocabulary),
        }
    }
}

impl TransformStep for RemapTaxonInformation {
    fn name(&self) -> &str {
        "RemapTaxonInformation"
    }

    fn description(&self) -> String {
        "Update taxon information based on MARIS species LUT".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.dataset.group(BIOTA, self.name())?;
        let vocabulary = self.vocabulary.load()?;
        let table = ctx.dataset.group_mut(BIOTA, "RemapTaxonInformation")?;

        if table.has_column("RUBIN") {
            table.map_column("RUBIN", "TaxonRepName", Value::clone);
        } else {
            table.add_column("TaxonRepName", Value::text(UNKNOWN_TAXON));
        }

        let mut unmatched: Vec<String> = Vec::new();
        for column in TAXON_COLUMNS {
            table.derive_column(column, |t, i| {
                let species = t.value(i, "species");
                let attribute = species
                    .as_i64()
                    .and_then(|id| vocabulary.by_id(id))
                    .and_then(|entry| entry.attribute(column));
                match attribute {
                    Some(value) => Value::text(value),
                    None => {
                        if column == "Taxonname" && !unmatched.contains(&species.key()) {
                            unmatched.push(species.key());
                        }
                        Value::text(UNKNOWN_TAXON)
                    }
                }
            });
        }

        if !unmatched.is_empty() {
            ctx.note(format!("Unmatched species IDs: {}", unmatched.join(", ")));
        }
        Ok(())
    }
}

/// Provisional handling of inconsistent HELCOM sediment codes.
///
/// The provider has yet to confirm what codes 56 and 73 mean; until then
/// they, and missing codes, are replaced by `replacement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SedimentRules {
    pub inconsistent_codes: Vec<i64>,
    pub missing_is_inconsistent: bool,
    pub replacement: i64,
}

impl Default for SedimentRules {
    fn default() -> Self {
        Self {
            inconsistent_codes: vec![56, 73],
            missing_is_inconsistent: true,
            replacement: -99,
        }
    }
}

impl SedimentRules {
    pub fn apply(&self, code: &Value) -> Value {
        match code {
            Value::Missing if self.missing_is_inconsistent => Value::from(self.replacement),
            other => match other.as_i64() {
                Some(c) if self.inconsistent_codes.contains(&c) => Value::from(self.replacement),
                _ => other.clone(),
            },
        }
    }
}

/// Sediment type id from the `SEDI` code.
///
/// The lookup is keyed by the numeric code, though it was matched on the
/// provider's sediment type names.
pub struct RemapSediment {
    source: Box<dyn IdLookupSource>,
    rules: SedimentRules,
}

impl RemapSediment {
    pub fn new(source: impl IdLookupSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            rules: SedimentRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: SedimentRules) -> Self {
        self.rules = rules;
        self
    }
}

impl TransformStep for RemapSediment {
    fn name(&self) -> &str {
        "RemapSediment"
    }

    fn description(&self) -> String {
        "Update sediment id based on MARIS species LUT (dbo_sedtype.xlsx)".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.dataset.group(SEDIMENT, self.name())?;
        let lookup = self.source.load()?;
        let table = ctx.dataset.group_mut(SEDIMENT, "RemapSediment")?;

        if !table.has_column("SEDI") {
            ctx.note("Group 'sediment' has no 'SEDI' column");
            return Ok(());
        }

        table.map_column("SEDI", "SedRepName", Value::clone);
        let rules = &self.rules;
        table.map_column("SEDI", "SEDI", |v| rules.apply(v));

        let mut unmatched: Vec<String> = Vec::new();
        table.map_column("SEDI", "sed_type", |v| match lookup.get(&v.key()) {
            Some(id) => Value::from(*id),
            None => {
                if !unmatched.contains(&v.key()) {
                    unmatched.push(v.key());
                }
                Value::from(UNMATCHED_ID)
            }
        });

        if !unmatched.is_empty() {
            ctx.note(format!("Unmatched SEDI: {}", unmatched.join(", ")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TransformLog;
    use crate::steps::StaticLookup;
    use crate::table::{Dataset, SEAWATER, Table};
    use crate::vocab::{StaticVocabulary, VocabularyEntry};
    use crate::MariscoError;

    fn run(step: &mut dyn TransformStep, ds: &mut Dataset) -> Result<TransformLog> {
        let mut log = TransformLog::new();
        step.apply(&mut StepContext::new(ds, &mut log, "test"))?;
        Ok(log)
    }

    fn biota() -> Dataset {
        Dataset::new().with_group(
            BIOTA,
            Table::from_rows(
                ["RUBIN", "TISSUE"],
                vec![
                    vec!["GADU MOR".into(), Value::Number(5.0)],
                    vec!["NEW SPEC".into(), Value::Number(5.0)],
                    vec![Value::Missing, Value::Number(-1.0)],
                ],
            ),
        )
    }

    #[test]
    fn test_remap_preserves_sentinels() {
        let mut ds = biota();
        let lookup = StaticLookup::from_pairs(&[("GADU MOR", 99), ("5", 52)]);
        run(&mut Remap::new(lookup.clone(), "species", "RUBIN", &[BIOTA]), &mut ds).unwrap();
        let log = run(&mut Remap::new(lookup, "body_part", "TISSUE", &[BIOTA]), &mut ds).unwrap();

        let t = ds.get(BIOTA).unwrap();
        assert_eq!(t.value(0, "species"), &Value::Number(99.0));
        assert_eq!(t.value(1, "species"), &Value::from(UNMATCHED_ID));
        assert_eq!(t.value(2, "species"), &Value::from(NOT_AVAILABLE_ID));
        assert_eq!(t.value(2, "body_part"), &Value::from(UNMATCHED_ID));
        assert!(log.notes().is_empty());
    }

    #[test]
    fn test_remap_requires_group() {
        let mut ds = Dataset::new().with_group(SEAWATER, Table::empty());
        let step = &mut Remap::new(StaticLookup::default(), "species", "RUBIN", &[BIOTA]);
        assert!(matches!(run(step, &mut ds), Err(MariscoError::MissingGroup { .. })));
    }

    #[test]
    fn test_taxon_information() {
        let mut ds = biota();
        run(
            &mut Remap::new(StaticLookup::from_pairs(&[("GADU MOR", 99)]), "species", "RUBIN", &[BIOTA]),
            &mut ds,
        )
        .unwrap();
        let species = StaticVocabulary::new(
            "species",
            vec![VocabularyEntry::new(99, "Gadus morhua")
                .with_attribute("Taxonname", "Gadus morhua")
                .with_attribute("Taxonrank", "species")],
        );
        let log = run(&mut RemapTaxonInformation::new(species), &mut ds).unwrap();

        let t = ds.get(BIOTA).unwrap();
        assert_eq!(t.value(0, "Taxonname"), &Value::text("Gadus morhua"));
        assert_eq!(t.value(0, "TaxonDB"), &Value::text(UNKNOWN_TAXON));
        assert_eq!(t.value(1, "Taxonname"), &Value::text(UNKNOWN_TAXON));
        assert_eq!(t.value(0, "TaxonRepName"), &Value::text("GADU MOR"));
        assert_eq!(log.notes().len(), 1);
    }

    #[test]
    fn test_sediment_provisional_codes() {
        let mut ds = Dataset::new().with_group(
            SEDIMENT,
            Table::from_rows(
                ["SEDI"],
                vec![
                    vec![Value::Number(56.0)],
                    vec![Value::Number(2.0)],
                    vec![Value::Missing],
                    vec![Value::Number(40.0)],
                ],
            ),
        );
        let lookup = StaticLookup::from_pairs(&[("-99", 0), ("2", 5)]);
        let log = run(&mut RemapSediment::new(lookup), &mut ds).unwrap();

        let t = ds.get(SEDIMENT).unwrap();
        assert_eq!(t.value(0, "SEDI"), &Value::Number(-99.0));
        assert_eq!(t.value(0, "SedRepName"), &Value::Number(56.0));
        assert_eq!(t.value(0, "sed_type"), &Value::Number(0.0));
        assert_eq!(t.value(1, "sed_type"), &Value::Number(5.0));
        assert_eq!(t.value(2, "sed_type"), &Value::Number(0.0));
        assert_eq!(t.value(3, "sed_type"), &Value::from(UNMATCHED_ID));
        assert!(log.notes()[0].message.contains("40"));
    }

    #[test]
    fn test_sediment_rules_configurable() {
        let rules = SedimentRules {
            inconsistent_codes: vec![73],
            missing_is_inconsistent: false,
            replacement: -1,
        };
        assert_eq!(rules.apply(&Value::Number(56.0)), Value::Number(56.0));
        assert_eq!(rules.apply(&Value::Number(73.0)), Value::Number(-1.0));
        assert!(rules.apply(&Value::Missing).is_missing());
    }
}
