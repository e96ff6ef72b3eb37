//! Per-sample bookkeeping columns: sample type, lab code, station, notes,
//! sediment slices, dry/wet ratio and filtering.

use indexmap::IndexMap;

use crate::error::Result;
use crate::pipeline::{StepContext, TransformStep};
use crate::table::{BIOTA, SEAWATER, SEDIMENT, SUSPENDED_MATTER, Value};

/// MARIS sample type id of a group.
pub fn sample_type_id(group: &str) -> Option<i64> {
    match group {
        SEAWATER => Some(1),
        SEDIMENT => Some(2),
        BIOTA => Some(3),
        SUSPENDED_MATTER => Some(4),
        _ => None,
    }
}

/// Add a `samptype_id` column derived from the group name.
#[derive(Debug, Clone, Default)]
pub struct AddSampleTypeIdColumn;

impl TransformStep for AddSampleTypeIdColumn {
    fn name(&self) -> &str {
        "AddSampleTypeIdColumn"
    }

    fn description(&self) -> String {
        "Add a column with the sample type id as defined in MARIS".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            match sample_type_id(group) {
                Some(id) => table.add_column("samptype_id", Value::from(id)),
                None => notes.push(format!("Unknown sample type '{}'", group)),
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Copy one column into another in every group that has it.
#[derive(Debug, Clone)]
struct CopyColumn {
    from: &'static str,
    to: &'static str,
}

impl CopyColumn {
    fn apply(&self, ctx: &mut StepContext<'_>) {
        let mut missing = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            if !table.map_column(self.from, self.to, Value::clone) {
                missing.push(group.clone());
            }
        }
        for group in missing {
            ctx.note(format!("Group '{}' has no '{}' column", group, self.from));
        }
    }
}

/// `KEY` → `samplabcode`.
#[derive(Debug, Clone, Default)]
pub struct AddSampleLabCode;

impl TransformStep for AddSampleLabCode {
    fn name(&self) -> &str {
        "AddSampleLabCode"
    }

    fn description(&self) -> String {
        "Remap `KEY` column to `samplabcode` in each DataFrame".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        CopyColumn { from: "KEY", to: "samplabcode" }.apply(ctx);
        Ok(())
    }
}

/// `STATION` → `station`.
#[derive(Debug, Clone, Default)]
pub struct RemapStationId;

impl TransformStep for RemapStationId {
    fn name(&self) -> &str {
        "RemapStationId"
    }

    fn description(&self) -> String {
        "Remap Station ID to MARIS format".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        CopyColumn { from: "STATION", to: "station" }.apply(ctx);
        Ok(())
    }
}

/// Describe the analysis method of each measurement in `measurenote`.
#[derive(Debug, Clone)]
pub struct AddMeasurementNote {
    methods: IndexMap<String, String>,
}

impl AddMeasurementNote {
    /// `methods` maps `METHOD` codes to their descriptions.
    pub fn new(methods: IndexMap<String, String>) -> Self {
        Self { methods }
    }
}

impl TransformStep for AddMeasurementNote {
    fn name(&self) -> &str {
        "AddMeasurementNote"
    }

    fn description(&self) -> String {
        "Record measurement notes by adding a 'measurenote' column to DataFrames".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (_, table) in ctx.dataset.iter_mut() {
            table.map_column("METHOD", "measurenote", |v| {
                self.methods
                    .get(&v.key())
                    .map(|d| Value::text(d.clone()))
                    .unwrap_or_default()
            });
        }
        Ok(())
    }
}

/// Sediment slice `UPPSLI`/`LOWSLI` → `top`/`bottom`. Requires the sediment
/// group.
#[derive(Debug, Clone, Default)]
pub struct RemapSedSliceTopBottom;

impl TransformStep for RemapSedSliceTopBottom {
    fn name(&self) -> &str {
        "RemapSedSliceTopBottom"
    }

    fn description(&self) -> String {
        "Remap Sediment slice top and bottom to MARIS format".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let table = ctx.dataset.group_mut(SEDIMENT, "RemapSedSliceTopBottom")?;
        let mut missing = Vec::new();
        for (from, to) in [("UPPSLI", "top"), ("LOWSLI", "bottom")] {
            if !table.map_column(from, to, Value::clone) {
                missing.push(from);
            }
        }
        for column in missing {
            ctx.note(format!("Group 'sediment' has no '{}' column", column));
        }
        Ok(())
    }
}

/// `DW%` → `dry_wet_ratio`, with 0% read as missing.
#[derive(Debug, Clone, Default)]
pub struct LookupDryWetRatio;

impl TransformStep for LookupDryWetRatio {
    fn name(&self) -> &str {
        "LookupDryWetRatio"
    }

    fn description(&self) -> String {
        "Lookup dry-wet ratio and format for MARIS".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (_, table) in ctx.dataset.iter_mut() {
            table.map_column("DW%", "dry_wet_ratio", |v| match v.as_f64() {
                Some(ratio) if ratio == 0.0 => Value::Missing,
                _ => v.clone(),
            });
        }
        Ok(())
    }
}

/// Filtering flag `FILT`: `N`/`n` → 2 (not filtered), `F` → 1 (filtered),
/// anything else → 0.
#[derive(Debug, Clone)]
pub struct RemapFiltered {
    lut: IndexMap<String, i64>,
}

impl Default for RemapFiltered {
    fn default() -> Self {
        Self {
            lut: [("N", 2), ("n", 2), ("F", 1)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

impl TransformStep for RemapFiltered {
    fn name(&self) -> &str {
        "RemapFiltered"
    }

    fn description(&self) -> String {
        "Lookup FILT value in dataframe using the lookup table".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (_, table) in ctx.dataset.iter_mut() {
            table.map_column("FILT", "FILT", |v| {
                Value::from(self.lut.get(&v.key()).copied().unwrap_or(0))
            });
        }
        Ok(())
    }
}

/// Cast `STATION` to text, with missing stations as the empty string.
#[derive(Debug, Clone, Default)]
pub struct CastStationToString;

impl TransformStep for CastStationToString {
    fn name(&self) -> &str {
        "CastStationToString"
    }

    fn description(&self) -> String {
        "Convert STATION column to string type, filling any missing values with empty string"
            .to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (_, table) in ctx.dataset.iter_mut() {
            table.map_column("STATION", "STATION", |v| Value::text(v.key()));
        }
        Ok(())
    }
}

/// Prepend an `ID` column numbering the rows of each group from 0.
#[derive(Debug, Clone, Default)]
pub struct UniqueIndex;

impl TransformStep for UniqueIndex {
    fn name(&self) -> &str {
        "UniqueIndex"
    }

    fn description(&self) -> String {
        "Set unique index for each group".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (_, table) in ctx.dataset.iter_mut() {
            let ids = (0..table.row_count() as i64).map(Value::from).collect();
            table.insert_column(0, "ID", ids);
        }
        Ok(())
    }
}
