//! Output encoders and global attributes.

mod attributes;
mod csv_encoder;

use std::path::PathBuf;

use crate::error::Result;
use crate::table::Dataset;

pub use attributes::{GlobalAttributes, enum_subset};
pub use csv_encoder::{CsvEncoder, write_table};

/// Writes a harmonized dataset and its attributes somewhere durable.
pub trait Encoder {
    /// Encode `dataset`, returning the paths written.
    fn encode(&self, dataset: &Dataset, attrs: &GlobalAttributes) -> Result<Vec<PathBuf>>;
}
