//! Input parsing and provider data loading.

mod loader;
mod parser;
mod source;

pub use loader::{
    DEFAULT_EXCLUDED_REF_ID, DEFAULT_SAMPLE_TYPES, LegacyDump, LoadReport, load_helcom,
    load_provider_table, zotero_key,
};
pub use parser::{Parser, ParserConfig};
pub use source::SourceMetadata;
