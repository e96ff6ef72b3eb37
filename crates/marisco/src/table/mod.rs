//! Tabular data model: values, tables, and multi-group datasets.

mod dataset;
#[allow(clippy::module_inception)]
mod table;
mod value;

pub use dataset::{BIOTA, Dataset, SEAWATER, SEDIMENT, SUSPENDED_MATTER};
pub use table::Table;
pub use value::{Value, is_null_value};
