//! Sequential execution of a step list over a dataset.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::step::{StepContext, TransformLog, TransformStep};
use crate::error::{MariscoError, Result};
use crate::table::{Dataset, Value};

/// An ordered list of steps.
///
/// Order is the dependency graph: a step may only rely on columns that an
/// earlier step produces.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn TransformStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn with_step(mut self, step: impl TransformStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: impl TransformStep + 'static) {
        self.steps.push(Box::new(step));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names, in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

/// Row and column counts of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupShape {
    pub rows: usize,
    pub columns: usize,
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub description: String,
    /// Total rows across groups before the step ran.
    pub rows_before: usize,
    pub rows_after: usize,
    /// Number of notes the step raised.
    pub notes: usize,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub groups_before: IndexMap<String, GroupShape>,
    pub groups_after: IndexMap<String, GroupShape>,
    pub steps: Vec<StepRecord>,
    pub duration_ms: u64,
}

impl RunReport {
    /// Rows removed by the whole run, across groups.
    pub fn rows_dropped(&self) -> usize {
        let before: usize = self.groups_before.values().map(|s| s.rows).sum();
        let after: usize = self.groups_after.values().map(|s| s.rows).sum();
        before.saturating_sub(after)
    }
}

/// Owns a dataset and runs a pipeline over it.
pub struct Transformer {
    dataset: Dataset,
    steps: Vec<Box<dyn TransformStep>>,
    log: TransformLog,
    cancel: Option<Arc<AtomicBool>>,
}

impl Transformer {
    pub fn new(dataset: Dataset, pipeline: Pipeline) -> Self {
        Self {
            dataset,
            steps: pipeline.steps,
            log: TransformLog::new(),
            cancel: None,
        }
    }

    /// Start from an existing log, e.g. one holding loader notes.
    pub fn with_log(mut self, log: TransformLog) -> Self {
        self.log = log;
        self
    }

    /// Stop before the next step once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run every step once, in order.
    ///
    /// Steps are consumed: a second call runs nothing. A structural error
    /// from a step aborts the run and is returned; the dataset keeps the
    /// changes made by the steps that completed.
    pub fn run(&mut self) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport {
            groups_before: shapes(&self.dataset),
            ..Default::default()
        };

        let steps = std::mem::take(&mut self.steps);
        for mut step in steps {
            if self.is_cancelled() {
                info!(step = %step.name(), "Cancellation requested, stopping");
                return Err(MariscoError::Cancelled(step.name().to_string()));
            }

            let name = step.name().to_string();
            let description = step.description();
            let rows_before = self.dataset.total_rows();
            let notes_before = self.log.notes().len();
            debug!(step = %name, "Applying step");

            self.log.push(description.clone());
            let mut ctx = StepContext::new(&mut self.dataset, &mut self.log, name.clone());
            step.apply(&mut ctx)?;

            report.steps.push(StepRecord {
                name,
                description,
                rows_before,
                rows_after: self.dataset.total_rows(),
                notes: self.log.notes().len() - notes_before,
            });
        }

        report.groups_after = shapes(&self.dataset);
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            steps = report.steps.len(),
            groups = report.groups_after.len(),
            rows = self.dataset.total_rows(),
            notes = self.log.notes().len(),
            duration_ms = report.duration_ms,
            "Pipeline finished"
        );
        Ok(report)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn log(&self) -> &TransformLog {
        &self.log
    }

    /// Distinct non-missing values of `column` across all groups.
    pub fn unique(&self, column: &str) -> Vec<Value> {
        self.dataset.unique_across(column)
    }

    pub fn into_parts(self) -> (Dataset, TransformLog) {
        (self.dataset, self.log)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn shapes(dataset: &Dataset) -> IndexMap<String, GroupShape> {
    dataset
        .iter()
        .map(|(name, table)| {
            (
                name.clone(),
                GroupShape {
                    rows: table.row_count(),
                    columns: table.column_count(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{SEAWATER, SEDIMENT, Table};

    /// Appends its tag to a `trace` column so tests can observe order.
    struct Tag(&'static str);

    impl TransformStep for Tag {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> String {
            format!("Tag {}", self.0)
        }

        fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
            for (_, table) in ctx.dataset.iter_mut() {
                table.derive_column("trace", |t, i| {
                    Value::text(format!("{}{}", t.value(i, "trace").key(), self.0))
                });
            }
            Ok(())
        }
    }

    struct NeedsSediment;

    impl TransformStep for NeedsSediment {
        fn name(&self) -> &str {
            "NeedsSediment"
        }

        fn description(&self) -> String {
            "Requires sediment".to_string()
        }

        fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
            ctx.dataset.group_mut(SEDIMENT, "NeedsSediment")?;
            Ok(())
        }
    }

    struct Flip(Arc<AtomicBool>);

    impl TransformStep for Flip {
        fn name(&self) -> &str {
            "Flip"
        }

        fn description(&self) -> String {
            "Request cancellation".to_string()
        }

        fn apply(&mut self, _ctx: &mut StepContext<'_>) -> Result<()> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn dataset() -> Dataset {
        Dataset::new().with_group(
            SEAWATER,
            Table::from_rows(["KEY"], vec![vec!["a".into()], vec!["b".into()]]),
        )
    }

    #[test]
    fn test_steps_run_in_order_and_are_logged() {
        let pipeline = Pipeline::new().with_step(Tag("a")).with_step(Tag("b")).with_step(Tag("c"));
        let mut tfm = Transformer::new(dataset(), pipeline);
        let report = tfm.run().unwrap();

        assert_eq!(tfm.dataset().get(SEAWATER).unwrap().value(0, "trace"), &Value::text("abc"));
        assert_eq!(tfm.log().entries(), &["Tag a", "Tag b", "Tag c"]);
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.groups_after[SEAWATER].columns, 2);
    }

    #[test]
    fn test_steps_run_once() {
        let mut tfm = Transformer::new(dataset(), Pipeline::new().with_step(Tag("x")));
        tfm.run().unwrap();
        let second = tfm.run().unwrap();
        assert!(second.steps.is_empty());
        assert_eq!(tfm.dataset().get(SEAWATER).unwrap().value(1, "trace"), &Value::text("x"));
    }

    #[test]
    fn test_missing_group_aborts_run() {
        let pipeline = Pipeline::new().with_step(NeedsSediment).with_step(Tag("never"));
        let mut tfm = Transformer::new(dataset(), pipeline);
        assert!(matches!(tfm.run(), Err(MariscoError::MissingGroup { .. })));
        assert!(!tfm.dataset().get(SEAWATER).unwrap().has_column("trace"));
    }

    #[test]
    fn test_cancellation_between_steps() {
        let flag = Arc::new(AtomicBool::new(false));
        let pipeline = Pipeline::new()
            .with_step(Tag("a"))
            .with_step(Flip(flag.clone()))
            .with_step(Tag("b"));
        let mut tfm = Transformer::new(dataset(), pipeline).with_cancel(flag);

        let err = tfm.run().unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(tfm.dataset().get(SEAWATER).unwrap().value(0, "trace"), &Value::text("a"));
    }
}
