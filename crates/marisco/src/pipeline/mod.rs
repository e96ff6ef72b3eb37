//! Pipeline engine: ordered steps over a shared dataset.
//!
//! ```no_run
//! use marisco::pipeline::{Pipeline, Transformer};
//! use marisco::steps::{AddSampleTypeIdColumn, LowerStripName};
//! use marisco::table::Dataset;
//!
//! let pipeline = Pipeline::new()
//!     .with_step(AddSampleTypeIdColumn)
//!     .with_step(LowerStripName::new("NUCLIDE"));
//! let mut tfm = Transformer::new(Dataset::new(), pipeline);
//! let report = tfm.run()?;
//! println!("{} steps, log: {}", report.steps.len(), tfm.log().joined());
//! # Ok::<(), marisco::MariscoError>(())
//! ```

mod step;
mod transformer;

pub use step::{StepContext, StepNote, TransformLog, TransformStep};
pub use transformer::{GroupShape, Pipeline, RunReport, StepRecord, Transformer};
