//! Named collection of sample-group tables.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{MariscoError, Result};

use super::table::Table;
use super::value::Value;

/// Group name for seawater samples.
pub const SEAWATER: &str = "seawater";
/// Group name for biota samples.
pub const BIOTA: &str = "biota";
/// Group name for sediment samples.
pub const SEDIMENT: &str = "sediment";
/// Group name for suspended matter samples.
pub const SUSPENDED_MATTER: &str = "suspended_matter";

/// The shared mutable state of a pipeline run: one table per sample group.
///
/// Groups iterate in insertion order, which is the order the loader
/// produced them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    groups: IndexMap<String, Table>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a group.
    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.groups.insert(name.into(), table);
    }

    pub fn with_group(mut self, name: impl Into<String>, table: Table) -> Self {
        self.insert(name, table);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.groups.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.groups.get_mut(name)
    }

    /// Access a group that `step` cannot work without.
    ///
    /// An absent group is a structural precondition violation and aborts the
    /// run.
    pub fn group(&self, name: &str, step: &str) -> Result<&Table> {
        self.groups.get(name).ok_or_else(|| MariscoError::MissingGroup {
            group: name.to_string(),
            step: step.to_string(),
        })
    }

    /// Mutable variant of [`Dataset::group`].
    pub fn group_mut(&mut self, name: &str, step: &str) -> Result<&mut Table> {
        self.groups
            .get_mut(name)
            .ok_or_else(|| MariscoError::MissingGroup {
                group: name.to_string(),
                step: step.to_string(),
            })
    }

    pub fn remove(&mut self, name: &str) -> Option<Table> {
        self.groups.shift_remove(name)
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.groups.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Table)> {
        self.groups.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of rows across all groups.
    pub fn total_rows(&self) -> usize {
        self.groups.values().map(Table::row_count).sum()
    }

    /// Distinct non-missing values of `column` across every group that has
    /// it, in first-appearance order.
    pub fn unique_across(&self, column: &str) -> Vec<Value> {
        let mut seen = HashSet::new();
        self.groups
            .values()
            .flat_map(|t| t.unique_values(column))
            .filter(|v| seen.insert(v.key()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_group_is_error() {
        let ds = Dataset::new().with_group(SEAWATER, Table::empty());
        assert!(ds.group(SEAWATER, "test").is_ok());
        match ds.group(BIOTA, "RemapTaxonInformation") {
            Err(MariscoError::MissingGroup { group, step }) => {
                assert_eq!(group, "biota");
                assert_eq!(step, "RemapTaxonInformation");
            }
            other => panic!("Expected MissingGroup, got {:?}", other),
        }
    }

    #[test]
    fn test_unique_across_groups() {
        let sea = Table::from_rows(["NUCLIDE"], vec![vec!["cs137".into()], vec!["k40".into()]]);
        let bio = Table::from_rows(["NUCLIDE"], vec![vec!["k40".into()], vec!["pu239".into()]]);
        let ds = Dataset::new().with_group(SEAWATER, sea).with_group(BIOTA, bio);
        let keys: Vec<String> = ds.unique_across("NUCLIDE").iter().map(Value::key).collect();
        assert_eq!(keys, vec!["cs137", "k40", "pu239"]);
    }
}
