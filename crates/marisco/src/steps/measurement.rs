//! Measurement value, uncertainty, unit and detection limit steps.

use indexmap::IndexMap;

use crate::error::Result;
use crate::pipeline::{StepContext, TransformStep};
use crate::table::{BIOTA, SEAWATER, SEDIMENT, Value};
use crate::vocab::{NOT_AVAILABLE_ID, UNMATCHED_ID, Vocabulary, VocabularyLoader};

/// Source columns of one group's measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementColumns {
    /// Activity value.
    pub value: String,
    /// Relative uncertainty, in percent of the value.
    pub uncertainty: String,
    /// Detection limit flag (`<`, `=`...).
    pub detection_limit: String,
}

impl MeasurementColumns {
    pub fn new(value: &str, uncertainty: &str, detection_limit: &str) -> Self {
        Self {
            value: value.to_string(),
            uncertainty: uncertainty.to_string(),
            detection_limit: detection_limit.to_string(),
        }
    }
}

/// Group → measurement columns.
pub type MeasurementCoi = IndexMap<String, MeasurementColumns>;

/// Drop rows without a measured value and copy the group's value column
/// into `value`.
#[derive(Debug, Clone)]
pub struct SanitizeValue {
    coi: MeasurementCoi,
}

impl SanitizeValue {
    pub fn new(coi: MeasurementCoi) -> Self {
        Self { coi }
    }
}

impl TransformStep for SanitizeValue {
    fn name(&self) -> &str {
        "SanitizeValue"
    }

    fn description(&self) -> String {
        "Sanitize value/measurement by removing blank entries and populating `value` column"
            .to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            let Some(columns) = self.coi.get(group) else {
                notes.push(format!("No value column configured for '{}'", group));
                continue;
            };
            if !table.has_column(&columns.value) {
                notes.push(format!("Group '{}' has no '{}' column", group, columns.value));
                continue;
            }
            let dropped = table.retain_rows(|t, i| t.value(i, &columns.value).as_f64().is_some());
            if dropped > 0 {
                notes.push(format!("{} rows without a value dropped from '{}'", dropped, group));
            }
            table.map_column(&columns.value, "value", |v| Value::from(v.as_f64()));
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// `relative% × value / 100`, or `None` when either operand is missing.
pub fn relative_to_absolute(value: Option<f64>, relative_percent: Option<f64>) -> Option<f64> {
    Some(relative_percent? * value? / 100.0)
}

/// Convert relative uncertainty (%) into absolute `uncertainty`.
#[derive(Debug, Clone)]
pub struct NormalizeUncertainty {
    coi: MeasurementCoi,
}

impl NormalizeUncertainty {
    pub fn new(coi: MeasurementCoi) -> Self {
        Self { coi }
    }
}

impl TransformStep for NormalizeUncertainty {
    fn name(&self) -> &str {
        "NormalizeUncertainty"
    }

    fn description(&self) -> String {
        "Convert from relative error % to uncertainty of activity unit".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, columns) in &self.coi {
            let Some(table) = ctx.dataset.get_mut(group) else {
                continue;
            };
            if !table.has_column(&columns.uncertainty) {
                notes.push(format!("Group '{}' has no '{}' column", group, columns.uncertainty));
                continue;
            }
            table.derive_column("uncertainty", |t, i| {
                Value::from(relative_to_absolute(
                    t.value(i, &columns.value).as_f64(),
                    t.value(i, &columns.uncertainty).as_f64(),
                ))
            });
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Unit ids per group. Biota units depend on the `BASIS` of the sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRules {
    pub fixed: IndexMap<String, i64>,
    pub biota_basis: IndexMap<String, i64>,
    /// Unit for a biota basis not in `biota_basis`.
    pub unknown_basis: i64,
}

impl Default for UnitRules {
    fn default() -> Self {
        Self {
            // Bq/m3 and Bq/kg dry weight.
            fixed: [(SEAWATER.to_string(), 1), (SEDIMENT.to_string(), 4)]
                .into_iter()
                .collect(),
            // D: dry weight, W: wet weight, F: fresh (read as wet).
            biota_basis: [("D", 4), ("W", 5), ("F", 5)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            unknown_basis: NOT_AVAILABLE_ID,
        }
    }
}

/// Set the `unit` id column.
#[derive(Debug, Clone, Default)]
pub struct RemapUnit {
    rules: UnitRules,
}

impl RemapUnit {
    pub fn new(rules: UnitRules) -> Self {
        Self { rules }
    }
}

impl TransformStep for RemapUnit {
    fn name(&self) -> &str {
        "RemapUnit"
    }

    fn description(&self) -> String {
        "Set the `unit` id column in the DataFrames based on a lookup table".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            if let Some(unit) = self.rules.fixed.get(group) {
                table.add_column("unit", Value::from(*unit));
            } else if group == BIOTA {
                let rules = &self.rules;
                if !table.map_column("BASIS", "unit", |basis| {
                    let id = rules.biota_basis.get(&basis.key()).copied();
                    Value::from(id.unwrap_or(rules.unknown_basis))
                }) {
                    notes.push("Group 'biota' has no 'BASIS' column".to_string());
                }
            } else {
                notes.push(format!("No unit rule for group '{}'", group));
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Detection limit code assigned to a measured value with an uncertainty.
pub const DETECTED: &str = "=";
/// Detection limit code assigned when nothing else applies.
pub const DETECTION_NOT_AVAILABLE: &str = "Not Available";

/// Map the provider detection limit column to a MARIS detection limit id.
///
/// A code found in the vocabulary is used as is. Otherwise a row with both
/// a value and an uncertainty is a detected measurement (`=`), and any
/// other row is `Not Available`.
pub struct RemapDetectionLimit {
    coi: MeasurementCoi,
    vocabulary: Box<dyn VocabularyLoader>,
}

impl RemapDetectionLimit {
    pub fn new(coi: MeasurementCoi, vocabulary: impl VocabularyLoader + 'static) -> Self {
        Self {
            coi,
            vocabulary: Box::new(vocabulary),
        }
    }
}

fn detection_id(vocabulary: &Vocabulary, code: &str) -> Option<i64> {
    vocabulary.lookup(code).map(|e| e.id)
}

impl TransformStep for RemapDetectionLimit {
    fn name(&self) -> &str {
        "RemapDetectionLimit"
    }

    fn description(&self) -> String {
        "Remap value type to MARIS format".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let vocabulary = self.vocabulary.load()?;
        let detected = detection_id(&vocabulary, DETECTED).unwrap_or(UNMATCHED_ID);
        let not_available =
            detection_id(&vocabulary, DETECTION_NOT_AVAILABLE).unwrap_or(NOT_AVAILABLE_ID);

        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            let Some(columns) = self.coi.get(group) else {
                notes.push(format!("No detection limit columns configured for '{}'", group));
                continue;
            };
            if !table.has_column(&columns.detection_limit) {
                notes.push(format!(
                    "Group '{}' has no '{}' column",
                    group, columns.detection_limit
                ));
            }
            table.derive_column("detection_limit", |t, i| {
                let code = t.value(i, &columns.detection_limit);
                if let Some(id) = (!code.is_missing())
                    .then(|| detection_id(&vocabulary, &code.key()))
                    .flatten()
                {
                    return Value::from(id);
                }
                let measured = !t.value(i, &columns.value).is_missing()
                    && !t.value(i, &columns.uncertainty).is_missing();
                Value::from(if measured { detected } else { not_available })
            });
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Replace detection limit names with their ids (legacy dump `DL`).
pub struct SanitizeDetectionLimit {
    column: String,
    vocabulary: Box<dyn VocabularyLoader>,
}

impl SanitizeDetectionLimit {
    pub fn new(column: impl Into<String>, vocabulary: impl VocabularyLoader + 'static) -> Self {
        Self {
            column: column.into(),
            vocabulary: Box::new(vocabulary),
        }
    }
}

impl TransformStep for SanitizeDetectionLimit {
    fn name(&self) -> &str {
        "SanitizeDetectionLimit"
    }

    fn description(&self) -> String {
        "Assign Detection Limit name to its id based on MARIS nomenclature".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let vocabulary = self.vocabulary.load()?;
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            let mut unknown = 0;
            table.map_column(&self.column, &self.column, |v| match v {
                Value::Text(name) => match detection_id(&vocabulary, name) {
                    Some(id) => Value::from(id),
                    None => {
                        unknown += 1;
                        v.clone()
                    }
                },
                _ => v.clone(),
            });
            if unknown > 0 {
                notes.push(format!(
                    "{} unknown detection limit names left in '{}'",
                    unknown, group
                ));
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TransformLog;
    use crate::table::{Dataset, Table};
    use crate::vocab::StaticVocabulary;

    fn coi() -> MeasurementCoi {
        [(
            SEAWATER.to_string(),
            MeasurementColumns::new("VALUE_Bq/m³", "ERROR%_m³", "< VALUE_Bq/m³"),
        )]
        .into_iter()
        .collect()
    }

    fn run(step: &mut dyn TransformStep, ds: &mut Dataset) -> TransformLog {
        let mut log = TransformLog::new();
        step.apply(&mut StepContext::new(ds, &mut log, "test")).unwrap();
        log
    }

    fn seawater() -> Dataset {
        Dataset::new().with_group(
            SEAWATER,
            Table::from_rows(
                ["VALUE_Bq/m³", "ERROR%_m³", "< VALUE_Bq/m³"],
                vec![
                    vec![Value::Number(100.0), Value::Number(10.0), Value::Missing],
                    vec![Value::Missing, Value::Number(5.0), "<".into()],
                    vec![Value::Number(0.0), Value::Number(30.0), "<".into()],
                    vec![Value::Number(2.0), Value::Missing, Value::Missing],
                ],
            ),
        )
    }

    #[test]
    fn test_relative_to_absolute() {
        assert_eq!(relative_to_absolute(Some(100.0), Some(10.0)), Some(10.0));
        assert_eq!(relative_to_absolute(Some(0.0), Some(37.5)), Some(0.0));
        assert_eq!(relative_to_absolute(None, Some(10.0)), None);
    }

    #[test]
    fn test_sanitize_then_normalize() {
        let mut ds = seawater();
        let log = run(&mut SanitizeValue::new(coi()), &mut ds);
        assert_eq!(log.notes().len(), 1);
        run(&mut NormalizeUncertainty::new(coi()), &mut ds);

        let t = ds.get(SEAWATER).unwrap();
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.value(0, "value"), &Value::Number(100.0));
        assert_eq!(t.value(0, "uncertainty"), &Value::Number(10.0));
        assert_eq!(t.value(1, "uncertainty"), &Value::Number(0.0));
        assert!(t.value(2, "uncertainty").is_missing());
    }

    #[test]
    fn test_detection_limit_rules() {
        let mut ds = seawater();
        let vocab = StaticVocabulary::from_pairs(
            "detectlimit",
            &[(0, "Not Available"), (1, "="), (2, "<")],
        );
        run(&mut RemapDetectionLimit::new(coi(), vocab), &mut ds);

        let t = ds.get(SEAWATER).unwrap();
        let ids: Vec<&Value> = t.column("detection_limit").unwrap();
        assert_eq!(
            ids,
            vec![
                &Value::Number(1.0),
                &Value::Number(2.0),
                &Value::Number(2.0),
                &Value::Number(0.0)
            ]
        );
    }

    #[test]
    fn test_units() {
        let mut ds = Dataset::new()
            .with_group(SEAWATER, Table::from_rows(["KEY"], vec![vec!["a".into()]]))
            .with_group(
                BIOTA,
                Table::from_rows(
                    ["BASIS"],
                    vec![vec!["W".into()], vec!["D".into()], vec!["?".into()]],
                ),
            );
        run(&mut RemapUnit::default(), &mut ds);
        assert_eq!(ds.get(SEAWATER).unwrap().value(0, "unit"), &Value::Number(1.0));
        let biota = ds.get(BIOTA).unwrap();
        assert_eq!(biota.value(0, "unit"), &Value::Number(5.0));
        assert_eq!(biota.value(1, "unit"), &Value::Number(4.0));
        assert_eq!(biota.value(2, "unit"), &Value::Number(0.0));
    }

    #[test]
    fn test_sanitize_detection_limit_names() {
        let mut ds = Dataset::new().with_group(
            SEAWATER,
            Table::from_rows(["DL"], vec![vec!["<".into()], vec!["??".into()]]),
        );
        let vocab = StaticVocabulary::from_pairs("dl", &[(1, "="), (2, "<")]);
        let log = run(&mut SanitizeDetectionLimit::new("DL", vocab), &mut ds);
        let t = ds.get(SEAWATER).unwrap();
        assert_eq!(t.value(0, "DL"), &Value::Number(2.0));
        assert_eq!(t.value(1, "DL"), &Value::text("??"));
        assert_eq!(log.notes().len(), 1);
    }
}
