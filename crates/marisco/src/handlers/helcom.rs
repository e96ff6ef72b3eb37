//! HELCOM MORS handler.
//!
//! Reads the `SEA`/`SED`/`BIO` CSV exports of the MORS database and the
//! provider lookup tables shipped with them (`RUBIN_NAME.csv`,
//! `TISSUE.csv`, `SEDIMENT_TYPE.csv`, `ANALYSIS_METHOD.csv`), harmonizes
//! them onto MARIS vocabularies and encodes the result.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::info;

use super::{EncodeSummary, HandlerOutput, MarisLuts};
use crate::config::HandlerConfig;
use crate::encode::{Encoder, GlobalAttributes, enum_subset};
use crate::error::Result;
use crate::input::{DEFAULT_SAMPLE_TYPES, load_helcom, load_provider_table};
use crate::pipeline::{Pipeline, TransformLog, Transformer};
use crate::remap::{Fixes, JsonFileCache, Remapper, SharedCache, fixes, shared};
use crate::steps::{
    AddMeasurementNote, AddNuclideIdColumn, AddSampleLabCode, AddSampleTypeIdColumn,
    AttributeLookup, EncodeTime, EncodingTarget, LookupDryWetRatio, LowerStripName,
    MeasurementCoi, MeasurementColumns, NormalizeUncertainty, ParseCoordinates, ParseTime, Remap,
    RemapDetectionLimit, RemapFiltered, RemapNuclideName, RemapSedSliceTopBottom, RemapSediment,
    RemapStationId, RemapTaxonInformation, RemapUnit, RemapperLookup, ReshapeLongToWide,
    SanitizeLonLat, SanitizeValue, SelectAndRenameColumns, text_lookup,
};
use crate::table::{BIOTA, SEAWATER, SEDIMENT};
use crate::vocab::VocabularyLoader;

pub const NUCLIDES_CACHE: &str = "nuclides_helcom";
pub const SPECIES_CACHE: &str = "species_helcom";
pub const TISSUES_CACHE: &str = "tissues_helcom";
pub const SEDIMENTS_CACHE: &str = "sediments_helcom";

/// Step name under which loader notes are logged.
pub const LOAD_STEP: &str = "LoadHelcom";

/// Stem of the encoded output files.
pub const OUTPUT_STEM: &str = "helcom";

/// Provider nuclide spellings with no exact MARIS counterpart.
pub fn nuclide_fixes() -> Fixes {
    fixes(&[
        ("cs134137", "cs134_137_tot"),
        ("cm243244", "cm243_244_tot"),
        ("pu239240", "pu239_240_tot"),
        ("pu238240", "pu238_240_tot"),
        ("cs143", "cs137"),
        ("cs145", "cs137"),
        ("cs142", "cs137"),
        ("cs141", "cs137"),
        ("cs144", "cs137"),
        ("k-40", "k40"),
        ("cs140", "cs137"),
        ("cs146", "cs137"),
        ("cs139", "cs137"),
        ("cs138", "cs137"),
    ])
}

/// Outdated scientific names in `RUBIN_NAME.csv`.
pub fn species_fixes() -> Fixes {
    fixes(&[
        ("CARDIUM EDULE", "Cerastoderma edule"),
        ("LAMINARIA SACCHARINA", "Saccharina latissima"),
        ("PSETTA MAXIMA", "Scophthalmus maximus"),
        ("STIZOSTEDION LUCIOPERCA", "Sander luciopercas"),
    ])
}

pub fn tissue_fixes() -> Fixes {
    fixes(&[
        ("WHOLE FISH WITHOUT HEAD AND ENTRAILS", "Whole animal eviscerated without head"),
        ("ENTRAILS", "Viscera"),
        ("SKIN/EPIDERMIS", "Skin"),
    ])
}

pub fn sediment_fixes() -> Fixes {
    fixes(&[("NO DATA", "(Not available)")])
}

/// Value, relative uncertainty and detection limit columns per group.
pub fn measurement_columns() -> MeasurementCoi {
    [
        (SEAWATER, MeasurementColumns::new("VALUE_Bq/m³", "ERROR%_m³", "< VALUE_Bq/m³")),
        (BIOTA, MeasurementColumns::new("VALUE_Bq/kg", "ERROR%", "< VALUE_Bq/kg")),
        (SEDIMENT, MeasurementColumns::new("VALUE_Bq/kg", "ERROR%_kg", "< VALUE_Bq/kg")),
    ]
    .into_iter()
    .map(|(group, columns)| (group.to_string(), columns))
    .collect()
}

/// Builds and runs the HELCOM pipeline.
pub struct HelcomHandler {
    config: HandlerConfig,
    cache: SharedCache,
    cancel: Option<Arc<AtomicBool>>,
}

impl HelcomHandler {
    /// Handler with a JSON file cache in `config.cache_dir`.
    pub fn new(config: HandlerConfig) -> Self {
        let cache = shared(JsonFileCache::new(config.cache_dir.clone()));
        Self {
            config,
            cache,
            cancel: None,
        }
    }

    pub fn with_cache(mut self, cache: SharedCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// The full step list for `src_dir`, in dependency order.
    ///
    /// Provider lookup tables are read here; canonical vocabularies are
    /// read when the steps that need them run.
    pub fn build_pipeline(&self, src_dir: &Path, target: EncodingTarget) -> Result<Pipeline> {
        let luts = MarisLuts::new(&self.config);
        let coi = measurement_columns();
        let overwrite = self.config.overwrite_cache;

        let nuclide_lut = {
            let vocabulary = luts.nuclides();
            let cache = self.cache.clone();
            let fix = nuclide_fixes();
            let config = self.config.clone();
            move |values| {
                Remapper::from_values(values, vocabulary.clone(), NUCLIDES_CACHE, cache.clone())
                    .with_fallback(config.name_fallback())
                    .generate_lookup_table(&fix, overwrite)
            }
        };

        let species = Remapper::new(
            load_provider_table(src_dir.join("RUBIN_NAME.csv"))?,
            luts.species(),
            "RUBIN",
            "SCIENTIFIC NAME",
            SPECIES_CACHE,
            self.cache.clone(),
        )
        .with_fallback(self.config.species_fallback()?);

        let tissues = Remapper::new(
            load_provider_table(src_dir.join("TISSUE.csv"))?,
            luts.body_parts(),
            "TISSUE",
            "TISSUE_DESCRIPTION",
            TISSUES_CACHE,
            self.cache.clone(),
        )
        .with_fallback(self.config.name_fallback());

        let sediments = Remapper::new(
            load_provider_table(src_dir.join("SEDIMENT_TYPE.csv"))?,
            luts.sediments(),
            "SEDI",
            "SEDIMENT TYPE",
            SEDIMENTS_CACHE,
            self.cache.clone(),
        )
        .with_fallback(self.config.name_fallback());

        let methods = text_lookup(
            &load_provider_table(src_dir.join("ANALYSIS_METHOD.csv"))?,
            "METHOD",
            "DESCRIPTION",
        );

        let mut pipeline = Pipeline::new()
            .with_step(AddSampleTypeIdColumn)
            .with_step(LowerStripName::new("NUCLIDE"))
            .with_step(RemapNuclideName::new(nuclide_lut))
            .with_step(AddNuclideIdColumn::new("NUCLIDE", luts.nuclides()))
            .with_step(ParseTime)
            .with_step(EncodeTime::default())
            .with_step(SanitizeValue::new(coi.clone()))
            .with_step(NormalizeUncertainty::new(coi.clone()))
            .with_step(Remap::new(
                RemapperLookup::new(species, species_fixes()).with_overwrite(overwrite),
                "species",
                "RUBIN",
                &[BIOTA],
            ))
            .with_step(Remap::new(
                RemapperLookup::new(tissues, tissue_fixes()).with_overwrite(overwrite),
                "body_part",
                "TISSUE",
                &[BIOTA],
            ))
            .with_step(Remap::new(
                AttributeLookup::new(luts.species(), "biogroup_id"),
                "bio_group",
                "species",
                &[BIOTA],
            ))
            .with_step(RemapTaxonInformation::new(luts.species()))
            .with_step(
                RemapSediment::new(
                    RemapperLookup::new(sediments, sediment_fixes()).with_overwrite(overwrite),
                )
                .with_rules(self.config.sediment_rules.clone()),
            )
            .with_step(RemapUnit::default())
            .with_step(RemapDetectionLimit::new(coi, luts.detection_limits()))
            .with_step(RemapFiltered::default())
            .with_step(AddSampleLabCode)
            .with_step(AddMeasurementNote::new(methods))
            .with_step(RemapStationId)
            .with_step(RemapSedSliceTopBottom)
            .with_step(LookupDryWetRatio)
            .with_step(ParseCoordinates)
            .with_step(SanitizeLonLat::default())
            .with_step(SelectAndRenameColumns::for_target(target));

        if target == EncodingTarget::NetCdf {
            pipeline.push(ReshapeLongToWide::default());
        }
        Ok(pipeline)
    }

    /// Load `src_dir` and run the pipeline for the configured target.
    pub fn run(&self, src_dir: impl AsRef<Path>) -> Result<HandlerOutput> {
        let src_dir = src_dir.as_ref();
        let target = self.config.target;
        let (dataset, load) = load_helcom(src_dir, DEFAULT_SAMPLE_TYPES)?;
        let pipeline = self.build_pipeline(src_dir, target)?;
        info!(steps = pipeline.len(), encoding = %target, "Running HELCOM pipeline");

        let mut log = TransformLog::new();
        for note in &load.notes {
            log.push_note(LOAD_STEP, note.clone());
        }
        let mut transformer = Transformer::new(dataset, pipeline).with_log(log);
        if let Some(flag) = &self.cancel {
            transformer = transformer.with_cancel(flag.clone());
        }
        let report = transformer.run()?;
        let attributes = self.attributes(&transformer, target)?.with_sources(&load.sources);
        let (dataset, log) = transformer.into_parts();

        Ok(HandlerOutput {
            dataset,
            log,
            report,
            load,
            attributes,
        })
    }

    /// Run and write the result with `encoder`.
    pub fn encode(&self, src_dir: impl AsRef<Path>, encoder: &dyn Encoder) -> Result<EncodeSummary> {
        let output = self.run(src_dir)?;
        let files = encoder.encode(&output.dataset, &output.attributes)?;
        Ok(EncodeSummary {
            files,
            report: output.report,
            notes: output.log.notes().len(),
        })
    }

    fn attributes(&self, transformer: &Transformer, target: EncodingTarget) -> Result<GlobalAttributes> {
        let (species_column, body_part_column) = match target {
            EncodingTarget::NetCdf => ("species", "body_part"),
            EncodingTarget::OpenRefine => ("species_id", "bodypar_id"),
        };
        let luts = MarisLuts::new(&self.config);
        let mut attributes = GlobalAttributes::from_dataset(transformer.dataset())
            .with_id(self.config.zotero_key.clone())
            .with_keywords(self.config.keywords.as_slice())
            .with_log(transformer.log());

        let species = transformer.unique(species_column);
        if !species.is_empty() {
            attributes = attributes.with_enum("species", enum_subset(&species, &luts.species().load()?));
        }
        let body_parts = transformer.unique(body_part_column);
        if !body_parts.is_empty() {
            attributes =
                attributes.with_enum("body_part", enum_subset(&body_parts, &luts.body_parts().load()?));
        }
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remap::MemoryCache;
    use std::fs;
    use tempfile::TempDir;

    fn provider_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("RUBIN_NAME.csv"), "RUBIN,SCIENTIFIC NAME\nGADU MOR,GADUS MORHUA\n").unwrap();
        fs::write(dir.path().join("TISSUE.csv"), "TISSUE,TISSUE_DESCRIPTION\n5,FLESH WITHOUT BONES\n").unwrap();
        fs::write(dir.path().join("SEDIMENT_TYPE.csv"), "SEDI,SEDIMENT TYPE\n0,GRAVEL\n").unwrap();
        fs::write(dir.path().join("ANALYSIS_METHOD.csv"), "METHOD,DESCRIPTION\nKRIL01,Radiochemical\n").unwrap();
        dir
    }

    fn handler() -> HelcomHandler {
        HelcomHandler::new(HandlerConfig::default()).with_cache(shared(MemoryCache::new()))
    }

    #[test]
    fn test_pipeline_order() {
        let dir = provider_dir();
        let pipeline = handler().build_pipeline(dir.path(), EncodingTarget::NetCdf).unwrap();
        let names = pipeline.names();

        let pos = |name: &str| names.iter().position(|n| *n == name).unwrap();
        assert!(pos("RemapNuclideName") < pos("AddNuclideIdColumn"));
        assert!(pos("ParseTime") < pos("EncodeTime"));
        assert!(pos("SanitizeValue") < pos("NormalizeUncertainty"));
        assert!(pos("ParseCoordinates") < pos("SanitizeLonLat"));
        assert_eq!(names.last(), Some(&"ReshapeLongToWide"));
    }

    #[test]
    fn test_openrefine_stays_long() {
        let dir = provider_dir();
        let pipeline = handler().build_pipeline(dir.path(), EncodingTarget::OpenRefine).unwrap();
        assert_eq!(pipeline.names().last(), Some(&"SelectAndRenameColumns"));
    }

    #[test]
    fn test_missing_provider_table_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(handler().build_pipeline(dir.path(), EncodingTarget::NetCdf).is_err());
    }

    #[test]
    fn test_measurement_columns_cover_groups() {
        let coi = measurement_columns();
        assert_eq!(coi.len(), 3);
        assert_eq!(coi[BIOTA].uncertainty, "ERROR%");
        assert_eq!(nuclide_fixes().get("k-40").map(String::as_str), Some("k40"));
    }
}
