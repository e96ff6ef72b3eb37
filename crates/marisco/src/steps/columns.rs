//! Column selection and renaming for the output encodings.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MariscoError, Result};
use crate::pipeline::{StepContext, TransformStep};
use crate::table::{BIOTA, SEAWATER, SEDIMENT, Table, Value};

/// Ordered old → new column names.
pub type Rules = IndexMap<String, String>;

fn rules(pairs: &[(&str, &str)]) -> Rules {
    pairs
        .iter()
        .map(|(old, new)| (old.to_string(), new.to_string()))
        .collect()
}

/// Output encoding the column names are chosen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingTarget {
    #[default]
    NetCdf,
    OpenRefine,
}

impl FromStr for EncodingTarget {
    type Err = MariscoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "netcdf" => Ok(Self::NetCdf),
            "openrefine" => Ok(Self::OpenRefine),
            other => Err(MariscoError::Config(format!(
                "Invalid encoding target '{}'. Please use 'netcdf' or 'openrefine'",
                other
            ))),
        }
    }
}

impl fmt::Display for EncodingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetCdf => write!(f, "netcdf"),
            Self::OpenRefine => write!(f, "openrefine"),
        }
    }
}

/// Renaming rules shared by all groups plus per-group additions.
///
/// Only registered groups are renamed; others pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenamingRules {
    pub common: Rules,
    pub groups: IndexMap<String, Rules>,
}

impl RenamingRules {
    pub fn new(common: Rules) -> Self {
        Self {
            common,
            groups: IndexMap::new(),
        }
    }

    /// Register `group`, with rules that extend or override the common set.
    pub fn with_group(mut self, group: impl Into<String>, specific: Rules) -> Self {
        self.groups.insert(group.into(), specific);
        self
    }

    /// Merged rules for `group`, or `None` when the group is not registered.
    pub fn for_group(&self, group: &str) -> Option<Rules> {
        let specific = self.groups.get(group)?;
        let mut merged = self.common.clone();
        merged.extend(specific.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(merged)
    }

    /// Rules producing the variable names of the given encoding.
    pub fn for_target(target: EncodingTarget) -> Self {
        match target {
            EncodingTarget::NetCdf => Self::netcdf(),
            EncodingTarget::OpenRefine => Self::openrefine(),
        }
    }

    fn netcdf() -> Self {
        let common = rules(&[
            ("KEY", "key"),
            ("lat", "lat"),
            ("lon", "lon"),
            ("time", "time"),
            ("NUCLIDE", "nuclide"),
            ("detection_limit", "dl"),
            ("unit", "unit"),
            ("value", "value"),
            ("uncertainty", "unc"),
            ("SDEPTH", "smp_depth"),
            ("TDEPTH", "tot_depth"),
            ("counting_method", "counmet"),
            ("sampling_method", "sampmet"),
            ("preparation_method", "prepmet"),
            ("SALIN", "sal"),
            ("TTEMP", "temp"),
        ]);
        Self::new(common)
            .with_group(SEAWATER, Rules::new())
            .with_group(
                BIOTA,
                rules(&[
                    ("species", "species"),
                    ("body_part", "body_part"),
                    ("bio_group", "bio_group"),
                ]),
            )
            .with_group(
                SEDIMENT,
                rules(&[("sed_type", "sed_type"), ("top", "top"), ("bottom", "bottom")]),
            )
    }

    fn openrefine() -> Self {
        let common = rules(&[
            ("KEY", "key"),
            ("lat", "latitude"),
            ("lon", "longitude"),
            ("time", "begperiod"),
            ("nuclide_id", "nuclide_id"),
            ("detection_limit", "detection"),
            ("unit", "unit_id"),
            ("value", "activity"),
            ("uncertainty", "uncertaint"),
            ("SDEPTH", "sampdepth"),
            ("TDEPTH", "totdepth"),
            ("samptype_id", "samptype_id"),
            ("station", "station"),
            ("samplabcode", "samplabcode"),
            ("SALIN", "salinity"),
            ("TTEMP", "temperatur"),
            ("FILT", "filtered"),
            ("measurenote", "measurenote"),
        ]);
        Self::new(common)
            .with_group(SEAWATER, Rules::new())
            .with_group(
                BIOTA,
                rules(&[
                    ("species", "species_id"),
                    ("Taxonname", "Taxonname"),
                    ("TaxonRepName", "TaxonRepName"),
                    ("Taxonrank", "Taxonrank"),
                    ("TaxonDB", "TaxonDB"),
                    ("TaxonDBID", "TaxonDBID"),
                    ("TaxonDBURL", "TaxonDBURL"),
                    ("body_part", "bodypar_id"),
                    ("dry_wet_ratio", "percentwt"),
                ]),
            )
            .with_group(
                SEDIMENT,
                rules(&[
                    ("sed_type", "sedtype_id"),
                    ("top", "sliceup"),
                    ("bottom", "slicedown"),
                    ("SedRepName", "SedRepName"),
                    ("dry_wet_ratio", "percentwt"),
                ]),
            )
    }
}

/// Keep the columns named by `rules` (in rule order) plus existing columns
/// that are rename targets, then rename. Returns the rule keys absent from
/// the table.
pub fn select_and_rename(table: &mut Table, rules: &Rules) -> Vec<String> {
    let applicable: Rules = rules
        .iter()
        .filter(|(old, _)| table.has_column(old))
        .map(|(old, new)| (old.clone(), new.clone()))
        .collect();

    let mut keep: Vec<String> = applicable.keys().cloned().collect();
    keep.extend(
        applicable
            .values()
            .filter(|new| table.has_column(new))
            .cloned(),
    );
    table.select_columns(&keep);
    table.rename_columns(&applicable);

    // A rename can collide with a kept target; the first one wins.
    let names = table.columns.clone();
    table.select_columns(&names);

    rules
        .keys()
        .filter(|old| !applicable.contains_key(*old))
        .cloned()
        .collect()
}

/// Select and rename columns for an encoding target.
#[derive(Debug, Clone)]
pub struct SelectAndRenameColumns {
    rules: std::result::Result<RenamingRules, String>,
}

impl SelectAndRenameColumns {
    /// Build from a target name. An unknown name does not fail here: the
    /// step reports it when run and leaves the dataset untouched.
    pub fn new(target: &str) -> Self {
        Self {
            rules: target
                .parse::<EncodingTarget>()
                .map(RenamingRules::for_target)
                .map_err(|e| e.to_string()),
        }
    }

    pub fn for_target(target: EncodingTarget) -> Self {
        Self::with_rules(RenamingRules::for_target(target))
    }

    pub fn with_rules(rules: RenamingRules) -> Self {
        Self { rules: Ok(rules) }
    }
}

impl TransformStep for SelectAndRenameColumns {
    fn name(&self) -> &str {
        "SelectAndRenameColumns"
    }

    fn description(&self) -> String {
        "Select and rename columns in a DataFrame based on renaming rules for a specified encoding type"
            .to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let rules = match &self.rules {
            Ok(rules) => rules,
            Err(message) => {
                ctx.note(format!("Error fetching renaming rules: {}", message));
                return Ok(());
            }
        };

        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            let Some(group_rules) = rules.for_group(group) else {
                continue;
            };
            let not_found = select_and_rename(table, &group_rules);
            if !not_found.is_empty() {
                notes.push(format!(
                    "Group '{}' has renaming rules not applied: {}",
                    group,
                    not_found.join(", ")
                ));
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Keep only the columns named as keys of `rules`, in rule order.
#[derive(Debug, Clone)]
pub struct SelectColumns {
    rules: Rules,
}

impl SelectColumns {
    pub fn new(rules: Rules) -> Self {
        Self { rules }
    }
}

impl TransformStep for SelectColumns {
    fn name(&self) -> &str {
        "SelectColumns"
    }

    fn description(&self) -> String {
        "Select columns of interest".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let keep: Vec<String> = self.rules.keys().cloned().collect();
        for (_, table) in ctx.dataset.iter_mut() {
            table.select_columns(&keep);
        }
        Ok(())
    }
}

/// Rename columns; columns not named in `rules` keep their name.
#[derive(Debug, Clone)]
pub struct RenameColumns {
    rules: Rules,
}

impl RenameColumns {
    pub fn new(rules: Rules) -> Self {
        Self { rules }
    }
}

impl TransformStep for RenameColumns {
    fn name(&self) -> &str {
        "RenameColumns"
    }

    fn description(&self) -> String {
        "Renaming variables to MARIS standard names".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (_, table) in ctx.dataset.iter_mut() {
            table.rename_columns(&self.rules);
        }
        Ok(())
    }
}

/// Drop columns holding no information: entirely missing, or a single
/// value equal to the not-available id.
#[derive(Debug, Clone)]
pub struct DropNaColumns {
    na_value: f64,
}

impl DropNaColumns {
    pub fn new(na_value: f64) -> Self {
        Self { na_value }
    }

    fn is_na(&self, table: &Table, index: usize) -> bool {
        let mut values = table.column_values(index).peekable();
        if values.peek().is_none() {
            return false;
        }
        let mut all_missing = true;
        let mut all_na = true;
        for value in values {
            all_missing &= value.is_missing();
            all_na &= matches!(value, Value::Number(n) if *n == self.na_value);
        }
        all_missing || all_na
    }
}

impl Default for DropNaColumns {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl TransformStep for DropNaColumns {
    fn name(&self) -> &str {
        "DropNaColumns"
    }

    fn description(&self) -> String {
        "Drop variable containing only NaN or 'Not available' (id=0 in MARIS lookup tables)"
            .to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (_, table) in ctx.dataset.iter_mut() {
            let na: Vec<String> = (0..table.column_count())
                .filter(|&i| self.is_na(table, i))
                .map(|i| table.columns[i].clone())
                .collect();
            let na: Vec<&str> = na.iter().map(String::as_str).collect();
            table.drop_columns(&na);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TransformLog;
    use crate::table::Dataset;

    fn run(step: &mut dyn TransformStep, ds: &mut Dataset) -> TransformLog {
        let mut log = TransformLog::new();
        step.apply(&mut StepContext::new(ds, &mut log, "test")).unwrap();
        log
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!("netcdf".parse::<EncodingTarget>().unwrap(), EncodingTarget::NetCdf);
        assert_eq!(" OpenRefine ".parse::<EncodingTarget>().unwrap(), EncodingTarget::OpenRefine);
        assert!(matches!(
            "parquet".parse::<EncodingTarget>(),
            Err(MariscoError::Config(_))
        ));
    }

    #[test]
    fn test_group_rules_extend_common() {
        let rules = RenamingRules::for_target(EncodingTarget::OpenRefine);
        let biota = rules.for_group(BIOTA).unwrap();
        assert_eq!(biota.get("species").map(String::as_str), Some("species_id"));
        assert_eq!(biota.get("lat").map(String::as_str), Some("latitude"));
        assert!(rules.for_group("suspended_matter").is_none());
    }

    #[test]
    fn test_select_and_rename_reports_missing_keys() {
        let table = Table::from_rows(
            ["lon", "extra", "lat", "KEY"],
            vec![vec![Value::Number(12.0), "x".into(), Value::Number(54.0), "K1".into()]],
        );
        let mut ds = Dataset::new().with_group(SEAWATER, table);
        let common = rules(&[("KEY", "key"), ("lat", "latitude"), ("lon", "longitude"), ("SALIN", "salinity")]);
        let mut step =
            SelectAndRenameColumns::with_rules(RenamingRules::new(common).with_group(SEAWATER, Rules::new()));
        let log = run(&mut step, &mut ds);

        let t = ds.get(SEAWATER).unwrap();
        assert_eq!(t.columns, vec!["key", "latitude", "longitude"]);
        assert_eq!(t.value(0, "latitude"), &Value::Number(54.0));
        assert_eq!(log.notes().len(), 1);
        assert!(log.notes()[0].message.ends_with("SALIN"));
    }

    #[test]
    fn test_rename_collision_keeps_first() {
        let mut table = Table::from_rows(
            ["time", "begperiod"],
            vec![vec![Value::Number(1.0), Value::Number(2.0)]],
        );
        select_and_rename(&mut table, &rules(&[("time", "begperiod")]));
        assert_eq!(table.columns, vec!["begperiod"]);
        assert_eq!(table.value(0, "begperiod"), &Value::Number(1.0));
    }

    #[test]
    fn test_invalid_target_is_reported() {
        let mut ds = Dataset::new().with_group(
            SEAWATER,
            Table::from_rows(["lat"], vec![vec![Value::Number(1.0)]]),
        );
        let log = run(&mut SelectAndRenameColumns::new("parquet"), &mut ds);
        assert_eq!(log.notes().len(), 1);
        assert!(ds.get(SEAWATER).unwrap().has_column("lat"));
    }

    #[test]
    fn test_legacy_select_rename_drop() {
        let table = Table::from_rows(
            ["latitude", "ref_id", "area_id", "volume"],
            vec![
                vec![Value::Number(54.0), Value::Number(100.0), Value::Number(0.0), Value::Missing],
                vec![Value::Number(55.0), Value::Number(100.0), Value::Number(0.0), Value::Missing],
            ],
        );
        let mut ds = Dataset::new().with_group(SEAWATER, table);
        let cois = rules(&[("latitude", "LAT"), ("area_id", "AREA"), ("volume", "VOL")]);
        run(&mut SelectColumns::new(cois.clone()), &mut ds);
        run(&mut RenameColumns::new(cois), &mut ds);
        assert_eq!(ds.get(SEAWATER).unwrap().columns, vec!["LAT", "AREA", "VOL"]);

        run(&mut DropNaColumns::default(), &mut ds);
        assert_eq!(ds.get(SEAWATER).unwrap().columns, vec!["LAT"]);
    }
}
