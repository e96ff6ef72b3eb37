//! Long to wide reshaping: one row per sample, one column set per nuclide.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{MariscoError, Result};
use crate::pipeline::{StepContext, TransformStep};
use crate::table::{Table, Value};

/// Measurement columns that become per-nuclide columns.
pub const DEFAULT_VALUE_COLUMNS: [&str; 5] = ["value", "unc", "dl", "unit", "counmet"];

/// Pivot long per-nuclide rows into one row per sample.
///
/// Every column that is neither the nuclide column nor a measurement
/// column forms the sample key. `value` becomes `<nuclide>` and other
/// measurement columns become `<nuclide>_<column>`. Two rows with the same
/// key and nuclide are a [`MariscoError::DuplicateMeasurement`].
#[derive(Debug, Clone)]
pub struct ReshapeLongToWide {
    nuclide_column: String,
    value_columns: Vec<String>,
}

impl ReshapeLongToWide {
    pub fn new(nuclide_column: impl Into<String>, value_columns: &[&str]) -> Self {
        Self {
            nuclide_column: nuclide_column.into(),
            value_columns: value_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn wide_name(nuclide: &str, column: &str) -> String {
        if column == "value" {
            nuclide.to_string()
        } else {
            format!("{}_{}", nuclide, column)
        }
    }

    fn reshape(&self, group: &str, table: &Table) -> Result<(Table, usize)> {
        let Some(nuc_idx) = table.column_index(&self.nuclide_column) else {
            return Ok((table.clone(), 0));
        };
        let measures: Vec<(usize, &str)> = self
            .value_columns
            .iter()
            .filter_map(|c| table.column_index(c).map(|i| (i, c.as_str())))
            .collect();
        let key_columns: Vec<usize> = (0..table.column_count())
            .filter(|&i| i != nuc_idx && !measures.iter().any(|(m, _)| *m == i))
            .collect();

        let mut nuclides: Vec<String> = Vec::new();
        let mut samples: IndexMap<Vec<String>, (Vec<Value>, IndexMap<String, Vec<Value>>)> =
            IndexMap::new();
        let mut skipped = 0;

        for row in &table.rows {
            let nuclide = &row[nuc_idx];
            if nuclide.is_missing() {
                skipped += 1;
                continue;
            }
            let nuclide = nuclide.key();
            if !nuclides.contains(&nuclide) {
                nuclides.push(nuclide.clone());
            }

            let key: Vec<String> = key_columns.iter().map(|&i| row[i].key()).collect();
            let (_, measured) = samples.entry(key.clone()).or_insert_with(|| {
                (
                    key_columns.iter().map(|&i| row[i].clone()).collect(),
                    IndexMap::new(),
                )
            });
            if measured.contains_key(&nuclide) {
                return Err(MariscoError::DuplicateMeasurement {
                    group: group.to_string(),
                    nuclide,
                    key: format!("({})", key.join(", ")),
                });
            }
            measured.insert(nuclide, measures.iter().map(|(i, _)| row[*i].clone()).collect());
        }

        let mut columns: Vec<String> = key_columns
            .iter()
            .map(|&i| table.columns[i].clone())
            .collect();
        for nuclide in &nuclides {
            columns.extend(measures.iter().map(|(_, c)| Self::wide_name(nuclide, c)));
        }

        let rows = samples
            .into_values()
            .map(|(mut row, measured)| {
                for nuclide in &nuclides {
                    match measured.get(nuclide) {
                        Some(values) => row.extend(values.iter().cloned()),
                        None => row.extend(std::iter::repeat_n(Value::Missing, measures.len())),
                    }
                }
                row
            })
            .collect();

        Ok((Table::new(columns, rows), skipped))
    }
}

impl Default for ReshapeLongToWide {
    fn default() -> Self {
        Self::new("nuclide", &DEFAULT_VALUE_COLUMNS)
    }
}

impl TransformStep for ReshapeLongToWide {
    fn name(&self) -> &str {
        "ReshapeLongToWide"
    }

    fn description(&self) -> String {
        "Convert data from long to wide with renamed columns".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            if !table.has_column(&self.nuclide_column) {
                notes.push(format!(
                    "Group '{}' has no '{}' column, left in long format",
                    group, self.nuclide_column
                ));
                continue;
            }
            let before = table.row_count();
            let (wide, skipped) = self.reshape(group, table)?;
            debug!(group = %group, before, after = wide.row_count(), "Reshaped to wide");
            if skipped > 0 {
                notes.push(format!(
                    "{} rows without nuclide dropped from '{}'",
                    skipped, group
                ));
            }
            *table = wide;
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}
