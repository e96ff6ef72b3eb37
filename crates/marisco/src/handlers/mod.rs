//! Dataset handlers: provider-specific pipelines from raw files to encoded
//! output.
//!
//! - [`helcom`]: the HELCOM MORS Baltic Sea database.
//! - [`legacy`]: the MARIS legacy dump, one output per reference id.

pub mod helcom;
pub mod legacy;

use std::path::PathBuf;

use serde::Serialize;

use crate::config::HandlerConfig;
use crate::encode::GlobalAttributes;
use crate::input::LoadReport;
use crate::pipeline::{RunReport, TransformLog};
use crate::table::Dataset;
use crate::vocab::CsvVocabulary;

/// Everything a handler produced for one source.
#[derive(Debug, Clone)]
pub struct HandlerOutput {
    pub dataset: Dataset,
    pub log: TransformLog,
    pub report: RunReport,
    pub load: LoadReport,
    pub attributes: GlobalAttributes,
}

/// Paths written for one source, with the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct EncodeSummary {
    pub files: Vec<PathBuf>,
    pub report: RunReport,
    pub notes: usize,
}

/// The canonical MARIS vocabularies, read from CSV exports in `lut_dir`.
#[derive(Debug, Clone)]
pub struct MarisLuts {
    config: HandlerConfig,
}

impl MarisLuts {
    pub fn new(config: &HandlerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn nuclides(&self) -> CsvVocabulary {
        CsvVocabulary::new(self.config.lut_path("dbo_nuclide.csv"), "nuclide_id", "nc_name")
    }

    /// Species, with `biogroup_id` and the `Taxon*` columns as attributes.
    pub fn species(&self) -> CsvVocabulary {
        CsvVocabulary::new(self.config.lut_path("dbo_species.csv"), "species_id", "species")
    }

    pub fn body_parts(&self) -> CsvVocabulary {
        CsvVocabulary::new(self.config.lut_path("dbo_bodypar.csv"), "bodypar_id", "bodypar")
    }

    pub fn sediments(&self) -> CsvVocabulary {
        CsvVocabulary::new(self.config.lut_path("dbo_sedtype.csv"), "sedtype_id", "sedtype")
    }

    pub fn detection_limits(&self) -> CsvVocabulary {
        CsvVocabulary::new(self.config.lut_path("dbo_detectlimit.csv"), "id", "name")
    }
}
