//! Error types for the marisco library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for marisco operations.
///
/// Only structural problems are represented here. Per-row and per-value
/// issues (unparseable dates, unmatched vocabulary, missing optional
/// columns) are repaired or dropped by the steps and reported through the
/// transformation log instead.
#[derive(Debug, Error)]
pub enum MariscoError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A step requires a sample group that the dataset does not contain.
    #[error("Step '{step}' requires group '{group}', which is absent from the dataset")]
    MissingGroup { group: String, step: String },

    /// A required column is absent from a group.
    #[error("Column '{column}' not found in group '{group}'")]
    MissingColumn { column: String, group: String },

    /// Two long-format rows describe the same nuclide for the same sample.
    #[error("Duplicate measurement of '{nuclide}' in group '{group}' for sample key {key}")]
    DuplicateMeasurement {
        group: String,
        nuclide: String,
        key: String,
    },

    /// Lookup cache storage error.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The run was cancelled between two steps.
    #[error("Pipeline cancelled before step '{0}'")]
    Cancelled(String),
}

/// Result type alias for marisco operations.
pub type Result<T> = std::result::Result<T, MariscoError>;

impl MariscoError {
    /// Build an IO error carrying the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the run was cancelled rather than failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
