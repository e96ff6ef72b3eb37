//! MARIS legacy dump handler.
//!
//! The dump holds every reference dataset already in MARIS nomenclature, so
//! the pipeline only selects, renames and sanitizes. Each reference id is
//! encoded on its own.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{info, warn};

use super::MarisLuts;
use crate::config::HandlerConfig;
use crate::encode::{CsvEncoder, Encoder, GlobalAttributes};
use crate::error::{MariscoError, Result};
use crate::input::{LegacyDump, zotero_key};
use crate::pipeline::{Pipeline, RunReport, Transformer};
use crate::steps::{
    CastStationToString, DropNaColumns, EncodeTime, ParseIsoTime, RenameColumns, Rules,
    SanitizeDetectionLimit, SanitizeLonLat, SelectColumns, UniqueIndex,
};

/// MARIS database column → encoded variable name. Only these columns are
/// kept.
pub fn cois_renaming_rules() -> Rules {
    [
        ("sample_id", "SMP_ID"),
        ("latitude", "LAT"),
        ("longitude", "LON"),
        ("begperiod", "TIME"),
        ("sampdepth", "SMP_DEPTH"),
        ("totdepth", "TOT_DEPTH"),
        ("station", "STATION"),
        ("uncertaint", "UNC"),
        ("unit_id", "UNIT"),
        ("detection", "DL"),
        ("area_id", "AREA"),
        ("species_id", "SPECIES"),
        ("biogroup_id", "BIO_GROUP"),
        ("bodypar_id", "BODY_PART"),
        ("sedtype_id", "SED_TYPE"),
        ("volume", "VOL"),
        ("salinity", "SAL"),
        ("temperatur", "TEMP"),
        ("sampmet_id", "SAMP_MET"),
        ("prepmet_id", "PREP_MET"),
        ("counmet_id", "COUNT_MET"),
        ("activity", "VALUE"),
        ("nuclide_id", "NUCLIDE"),
        ("sliceup", "TOP"),
        ("slicedown", "BOTTOM"),
    ]
    .into_iter()
    .map(|(old, new)| (old.to_string(), new.to_string()))
    .collect()
}

/// Steps applied to every reference id.
pub fn build_pipeline(config: &HandlerConfig) -> Pipeline {
    let rules = cois_renaming_rules();
    Pipeline::new()
        .with_step(SelectColumns::new(rules.clone()))
        .with_step(RenameColumns::new(rules))
        .with_step(CastStationToString)
        .with_step(DropNaColumns::default())
        .with_step(SanitizeDetectionLimit::new("DL", MarisLuts::new(config).detection_limits()))
        .with_step(ParseIsoTime::new("TIME"))
        .with_step(EncodeTime::new("TIME"))
        .with_step(SanitizeLonLat::new("LAT", "LON"))
        .with_step(UniqueIndex)
}

/// A reference id that could not be encoded.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub ref_id: i64,
    pub error: String,
}

/// Outcome of encoding several reference ids.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Files written per encoded reference id.
    pub encoded: Vec<(i64, Vec<PathBuf>)>,
    pub failures: Vec<BatchFailure>,
    /// Reference ids not attempted because the batch was cancelled.
    pub skipped: Vec<i64>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Encodes reference ids of a legacy dump.
pub struct LegacyHandler {
    config: HandlerConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl LegacyHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Run the pipeline for one reference id and write it with `encoder`.
    pub fn encode_one(
        &self,
        dump: &LegacyDump,
        ref_id: i64,
        encoder: &dyn Encoder,
    ) -> Result<(Vec<PathBuf>, RunReport)> {
        let dataset = dump.dataset(Some(ref_id));
        if dataset.is_empty() {
            return Err(MariscoError::Config(format!(
                "No rows with a known sample type for ref_id {}",
                ref_id
            )));
        }
        let key = zotero_key(&dataset);

        let mut transformer = Transformer::new(dataset, build_pipeline(&self.config));
        if let Some(flag) = &self.cancel {
            transformer = transformer.with_cancel(flag.clone());
        }
        let report = transformer.run()?;

        let mut attributes = GlobalAttributes::from_dataset(transformer.dataset())
            .with_keywords(self.config.keywords.as_slice())
            .with_log(transformer.log())
            .with_sources(std::slice::from_ref(dump.source()));
        match key {
            Some(key) => attributes = attributes.with_id(key),
            None => warn!(ref_id, "No Zotero URL in legacy dataset"),
        }

        let files = encoder.encode(transformer.dataset(), &attributes)?;
        Ok((files, report))
    }

    /// Encode `ref_ids` (every id in the dump when `None`) into `dest_dir`,
    /// one CSV set per id named after it.
    ///
    /// A failing id is recorded and the batch moves on. Cancellation stops
    /// the batch; the remaining ids are reported as skipped.
    pub fn encode_all(
        &self,
        dump: &LegacyDump,
        ref_ids: Option<&[i64]>,
        dest_dir: impl Into<PathBuf>,
    ) -> BatchReport {
        let dest_dir = dest_dir.into();
        let ids = ref_ids.map_or_else(|| dump.ref_ids(), <[i64]>::to_vec);
        let mut report = BatchReport::default();

        for (i, &ref_id) in ids.iter().enumerate() {
            if self.is_cancelled() {
                report.skipped.extend_from_slice(&ids[i..]);
                break;
            }
            let encoder = CsvEncoder::new(&dest_dir, ref_id.to_string());
            match self.encode_one(dump, ref_id, &encoder) {
                Ok((files, _)) => {
                    info!(ref_id, files = files.len(), "Encoded reference dataset");
                    report.encoded.push((ref_id, files));
                }
                Err(e) if e.is_cancellation() => {
                    report.skipped.extend_from_slice(&ids[i..]);
                    break;
                }
                Err(e) => {
                    warn!(ref_id, error = %e, "Failed to encode reference dataset");
                    report.failures.push(BatchFailure {
                        ref_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            encoded = report.encoded.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Legacy batch finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DUMP: &str = "ref_id\tsamptype\tlatitude\tlongitude\tbegperiod\tstation\tdetection\tnuclide_id\tactivity\tarea_id\tzoterourl\n\
        100\tSeawater\t54.5\t12,5\t2012-05-23 00:00:00.000\t12\t=\t33\t5.1\t0\thttps://www.zotero.org/groups/2432820/maris/items/26VMZZ2Q\n\
        100\tSeawater\t95.0\t12.0\t2012-05-24 00:00:00.000\t\t<\t33\t2.0\t0\thttps://www.zotero.org/groups/2432820/maris/items/26VMZZ2Q\n\
        200\tBiota\t60.0\t20.0\tnot a date\tA\t=\t33\t1.0\t0\thttps://www.zotero.org/groups/2432820/maris/items/ABCD1234\n\
        300\tPlankton\t60.0\t20.0\t2012-05-24\tA\t=\t33\t1.0\t0\thttps://www.zotero.org/groups/2432820/maris/items/EFGH5678\n";

    fn fixture() -> (TempDir, LegacyDump, HandlerConfig) {
        let dir = TempDir::new().unwrap();
        let lut = dir.path().join("lut");
        fs::create_dir_all(&lut).unwrap();
        fs::write(lut.join("dbo_detectlimit.csv"), "id,name\n0,Not Available\n1,=\n2,<\n").unwrap();
        let dump_path = dir.path().join("dump.txt");
        fs::write(&dump_path, DUMP).unwrap();
        let dump = LegacyDump::load(&dump_path, &[]).unwrap();
        (dir, dump, HandlerConfig::default().with_lut_dir(lut))
    }

    #[test]
    fn test_encode_all_continues_past_failures() {
        let (dir, dump, config) = fixture();
        let out = dir.path().join("out");
        let report = LegacyHandler::new(config).encode_all(&dump, None, &out);

        assert_eq!(report.encoded.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].ref_id, 300);

        let csv = fs::read_to_string(out.join("100_seawater.csv")).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("ID,LAT,LON,TIME,STATION,DL,VALUE,NUCLIDE"));
        assert_eq!(lines.next(), Some("0,54.5,12.5,1337731200,12,1,5.1,33"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_cancelled_batch_skips_remaining() {
        let (dir, dump, config) = fixture();
        let flag = Arc::new(AtomicBool::new(true));
        let report = LegacyHandler::new(config)
            .with_cancel(flag)
            .encode_all(&dump, Some(&[100, 200]), dir.path().join("out"));
        assert!(report.encoded.is_empty());
        assert_eq!(report.skipped, vec![100, 200]);
        assert!(!report.is_success());
    }
}
