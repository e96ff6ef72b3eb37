//! Nuclide name normalization and id assignment.
//!
//! `AddNuclideIdColumn` must run after `RemapNuclideName`: ids are looked up
//! by canonical name, and provider spellings (`CS137`, `cs134137`, `k-40`)
//! only become canonical once remapped.

use tracing::debug;

use super::lookup::Lookup;
use crate::error::Result;
use crate::pipeline::{StepContext, TransformStep};
use crate::table::Value;
use crate::vocab::{UNMATCHED_ID, VocabularyLoader};

/// Lowercase a text column, trim it and remove inner blanks.
#[derive(Debug, Clone)]
pub struct LowerStripName {
    column: String,
}

impl LowerStripName {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

/// `" Cs 137 "` → `"cs137"`.
pub fn lower_strip(value: &Value) -> Value {
    match value {
        Value::Missing => Value::Missing,
        other => {
            let name: String = other
                .key()
                .to_lowercase()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if name.is_empty() {
                Value::Missing
            } else {
                Value::Text(name)
            }
        }
    }
}

impl TransformStep for LowerStripName {
    fn name(&self) -> &str {
        "LowerStripName"
    }

    fn description(&self) -> String {
        format!("Convert '{}' column to lowercase and strip spaces", self.column)
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut skipped = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            if !table.map_column(&self.column, &self.column, lower_strip) {
                skipped.push(group.clone());
            }
        }
        for group in skipped {
            ctx.note(format!("Group '{}' has no '{}' column", group, self.column));
        }
        Ok(())
    }
}

type NuclideLookupFn = Box<dyn FnMut(Vec<Value>) -> Result<Lookup>>;

/// Replace provider nuclide names with canonical ones.
///
/// The lookup is built when the step runs, from the distinct values of the
/// column across every group.
pub struct RemapNuclideName {
    column: String,
    fn_lut: NuclideLookupFn,
}

impl RemapNuclideName {
    pub fn new(fn_lut: impl FnMut(Vec<Value>) -> Result<Lookup> + 'static) -> Self {
        Self {
            column: "NUCLIDE".to_string(),
            fn_lut: Box::new(fn_lut),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

impl TransformStep for RemapNuclideName {
    fn name(&self) -> &str {
        "RemapNuclideName"
    }

    fn description(&self) -> String {
        "Remap data provider nuclide names to MARIS nuclide names".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let uniques = ctx.dataset.unique_across(&self.column);
        let lookup = (self.fn_lut)(uniques)?;

        let unmatched: Vec<&str> = lookup
            .iter()
            .filter(|(_, m)| !m.is_matched())
            .map(|(k, _)| k.as_str())
            .collect();
        if !unmatched.is_empty() {
            let message = format!("Unmatched nuclide names kept as is: {}", unmatched.join(", "));
            ctx.note(message);
        }

        for (_, table) in ctx.dataset.iter_mut() {
            table.map_column(&self.column, &self.column, |v| {
                match lookup.get(&v.key()).and_then(|m| m.matched_name.as_ref()) {
                    Some(name) => Value::text(name.clone()),
                    None => v.clone(),
                }
            });
        }
        debug!(entries = lookup.len(), "Remapped nuclide names");
        Ok(())
    }
}

/// Add `nuclide_id` from the canonical nuclide name in `column`.
pub struct AddNuclideIdColumn {
    column: String,
    vocabulary: Box<dyn VocabularyLoader>,
}

impl AddNuclideIdColumn {
    pub fn new(column: impl Into<String>, vocabulary: impl VocabularyLoader + 'static) -> Self {
        Self {
            column: column.into(),
            vocabulary: Box::new(vocabulary),
        }
    }
}

impl TransformStep for AddNuclideIdColumn {
    fn name(&self) -> &str {
        "AddNuclideIdColumn"
    }

    fn description(&self) -> String {
        format!("Add a `nuclide_id` column from the '{}' column", self.column)
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let vocabulary = self.vocabulary.load()?;
        let mut notes = Vec::new();

        for (group, table) in ctx.dataset.iter_mut() {
            let mut unknown = Vec::new();
            let found = table.map_column(&self.column, "nuclide_id", |v| {
                if v.is_missing() {
                    return Value::from(UNMATCHED_ID);
                }
                match vocabulary.lookup(&v.key()) {
                    Some(entry) => Value::from(entry.id),
                    None => {
                        if !unknown.contains(&v.key()) {
                            unknown.push(v.key());
                        }
                        Value::from(UNMATCHED_ID)
                    }
                }
            });
            if !found {
                notes.push(format!("Group '{}' has no '{}' column", group, self.column));
            } else if !unknown.is_empty() {
                notes.push(format!(
                    "Unknown nuclides in '{}' set to {}: {}",
                    group,
                    UNMATCHED_ID,
                    unknown.join(", ")
                ));
            }
        }

        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}
