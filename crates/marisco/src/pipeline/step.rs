//! The step contract and the context steps run against.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::table::Dataset;

/// One unit of work in a pipeline.
///
/// A step mutates the dataset in place. Per-row and per-value problems are
/// repaired or dropped and reported through [`StepContext::note`]; only
/// structural problems are returned as errors, and those abort the run.
pub trait TransformStep {
    /// Short identifier, used in diagnostics and the run report.
    fn name(&self) -> &str;

    /// One-line description recorded in the transformation log.
    fn description(&self) -> String;

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()>;
}

/// A data-quality caveat raised by a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepNote {
    pub step: String,
    pub message: String,
}

/// Append-only record of a pipeline run.
///
/// `entries` holds the description of every step that ran, in order;
/// `notes` holds the caveats the steps reported along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformLog {
    entries: Vec<String>,
    notes: Vec<StepNote>,
}

impl TransformLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn push_note(&mut self, step: impl Into<String>, message: impl Into<String>) {
        self.notes.push(StepNote {
            step: step.into(),
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn notes(&self) -> &[StepNote] {
        &self.notes
    }

    /// Notes raised by one step.
    pub fn notes_for<'a>(&'a self, step: &'a str) -> impl Iterator<Item = &'a StepNote> + 'a {
        self.notes.iter().filter(move |n| n.step == step)
    }

    /// Entries, then notes as `step: message`, joined the way they are
    /// published in the dataset metadata.
    pub fn joined(&self) -> String {
        self.entries
            .iter()
            .cloned()
            .chain(self.notes.iter().map(|n| format!("{}: {}", n.step, n.message)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Mutable state handed to [`TransformStep::apply`].
pub struct StepContext<'a> {
    pub dataset: &'a mut Dataset,
    log: &'a mut TransformLog,
    step: String,
}

impl<'a> StepContext<'a> {
    pub fn new(dataset: &'a mut Dataset, log: &'a mut TransformLog, step: impl Into<String>) -> Self {
        Self {
            dataset,
            log,
            step: step.into(),
        }
    }

    /// Name of the running step.
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Report a non-fatal problem.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(step = %self.step, "{}", message);
        self.log.push_note(self.step.clone(), message);
    }

    /// Read-only view of the log.
    pub fn log(&self) -> &TransformLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_log() {
        let mut log = TransformLog::new();
        log.push("Parse time");
        log.push("Encode time");
        assert_eq!(log.joined(), "Parse time, Encode time");
    }

    #[test]
    fn test_joined_log_publishes_notes() {
        let mut log = TransformLog::new();
        log.push("Add a `nuclide_id` column");
        log.push_note("AddNuclideIdColumn", "Unmatched nuclide 'cs134137'");
        assert_eq!(
            log.joined(),
            "Add a `nuclide_id` column, AddNuclideIdColumn: Unmatched nuclide 'cs134137'"
        );
    }

    #[test]
    fn test_notes_are_attributed() {
        let mut dataset = Dataset::new();
        let mut log = TransformLog::new();
        let mut ctx = StepContext::new(&mut dataset, &mut log, "ParseTime");
        ctx.note("3 rows without a usable date");
        assert_eq!(log.notes_for("ParseTime").count(), 1);
        assert_eq!(log.notes_for("EncodeTime").count(), 0);
    }
}
