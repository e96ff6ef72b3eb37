//! marisco: harmonization of marine radioactivity datasets.
//!
//! Provider datasets (HELCOM MORS, the MARIS legacy dump) arrive with their
//! own column names, free-text vocabularies and date and coordinate
//! conventions. marisco maps them onto the canonical MARIS vocabularies and
//! encodes the result.
//!
//! # Core Pieces
//!
//! - **Pipeline**: an ordered list of [`TransformStep`](pipeline::TransformStep)s
//!   run once each over a multi-group [`Dataset`](table::Dataset)
//! - **Remapper**: exact, fixed and fallback matching of provider values to
//!   canonical ids, with a persistent lookup cache
//! - **Steps**: the domain transformations (time, coordinates, units,
//!   detection limits, taxonomy...)
//!
//! # Example
//!
//! ```no_run
//! use marisco::config::HandlerConfig;
//! use marisco::encode::CsvEncoder;
//! use marisco::handlers::helcom::HelcomHandler;
//!
//! let config = HandlerConfig::new().with_lut_dir("lut").with_cache_dir("cache");
//! let handler = HelcomHandler::new(config);
//! let summary = handler.encode("data/helcom", &CsvEncoder::new("out", "helcom"))?;
//!
//! println!("Files: {}", summary.files.len());
//! println!("Rows dropped: {}", summary.report.rows_dropped());
//! # Ok::<(), marisco::MariscoError>(())
//! ```

pub mod config;
pub mod encode;
pub mod error;
pub mod handlers;
pub mod input;
pub mod pipeline;
pub mod remap;
pub mod steps;
pub mod table;
pub mod vocab;

pub use error::{MariscoError, Result};
pub use table::{Dataset, Table, Value};
