//! Raw data loaders for provider datasets.
//!
//! Two layouts are supported:
//!
//! - HELCOM MORS exports: one `<PREFIX>01.csv` sample file and one
//!   `<PREFIX>02.csv` measurement file per sample group, joined on `KEY`.
//! - The MARIS legacy dump: a single tab-separated file holding every
//!   reference id, split into groups by its `samptype` column.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{info, warn};

use super::parser::{Parser, ParserConfig};
use super::source::SourceMetadata;
use crate::error::Result;
use crate::table::{BIOTA, Dataset, SEAWATER, SEDIMENT, SUSPENDED_MATTER, Table, Value};

/// Default `(file prefix, group)` pairs of a HELCOM export.
pub const DEFAULT_SAMPLE_TYPES: &[(&str, &str)] =
    &[("SEA", SEAWATER), ("SED", SEDIMENT), ("BIO", BIOTA)];

/// Columns read as text even when they look numeric.
const TEXT_COLUMNS: &[&str] = &["KEY", "STATION", "NUCLIDE", "DATE", "station", "zoterourl"];

/// Reference id excluded from the legacy dump by default (test records).
pub const DEFAULT_EXCLUDED_REF_ID: i64 = 9999;

/// What a loader read, and what it could not.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Provenance of every file that was read.
    pub sources: Vec<SourceMetadata>,
    /// Human-readable notes about files that were skipped.
    pub notes: Vec<String>,
}

fn text_parser() -> Parser {
    Parser::with_config(ParserConfig {
        text_columns: TEXT_COLUMNS.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    })
}

/// Load a HELCOM export directory.
///
/// A group whose files are missing yields an empty table rather than an
/// error; the omission is logged and recorded in the report.
pub fn load_helcom(
    src_dir: impl AsRef<Path>,
    sample_types: &[(&str, &str)],
) -> Result<(Dataset, LoadReport)> {
    let src_dir = src_dir.as_ref();
    let parser = text_parser();
    let mut dataset = Dataset::new();
    let mut report = LoadReport::default();

    for (prefix, group) in sample_types {
        let meas_path = src_dir.join(format!("{}02.csv", prefix));
        let smp_path = src_dir.join(format!("{}01.csv", prefix));

        let missing: Vec<&PathBuf> = [&meas_path, &smp_path]
            .into_iter()
            .filter(|p| !p.exists())
            .collect();
        if !missing.is_empty() {
            let note = format!(
                "Error loading files for {}: {} not found",
                prefix,
                missing
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            warn!(group = %group, "{}", note);
            report.notes.push(note);
            dataset.insert(*group, Table::empty());
            continue;
        }

        let (measurements, meas_meta) = parser.parse_file(&meas_path)?;
        let (samples, smp_meta) = parser.parse_file(&smp_path)?;
        let merged = measurements.merge_left(&samples, "KEY");
        info!(
            group = %group,
            rows = merged.row_count(),
            columns = merged.column_count(),
            "Loaded HELCOM group"
        );

        report.sources.push(meas_meta);
        report.sources.push(smp_meta);
        dataset.insert(*group, merged);
    }

    Ok((dataset, report))
}

/// Load a provider lookup table (e.g. `RUBIN_NAME.csv`) from a source
/// directory.
pub fn load_provider_table(path: impl AsRef<Path>) -> Result<Table> {
    let (table, _) = text_parser().parse_file(path)?;
    Ok(table)
}

/// The MARIS legacy dump, held in memory so several reference ids can be
/// encoded from a single read.
#[derive(Debug, Clone)]
pub struct LegacyDump {
    table: Table,
    source: SourceMetadata,
}

impl LegacyDump {
    /// Read the dump, dropping rows whose `ref_id` is in `exclude_ref_ids`.
    pub fn load(path: impl AsRef<Path>, exclude_ref_ids: &[i64]) -> Result<Self> {
        let parser = Parser::with_config(ParserConfig {
            delimiter: Some(b'\t'),
            text_columns: TEXT_COLUMNS.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        });
        let (mut table, source) = parser.parse_file(path)?;
        let excluded = table.retain_rows(|t, i| {
            t.value(i, "ref_id")
                .as_i64()
                .is_none_or(|id| !exclude_ref_ids.contains(&id))
        });
        info!(
            rows = table.row_count(),
            excluded,
            file = %source.file,
            "Loaded MARIS legacy dump"
        );
        Ok(Self { table, source })
    }

    pub fn source(&self) -> &SourceMetadata {
        &self.source
    }

    /// Distinct reference ids, in first-appearance order.
    pub fn ref_ids(&self) -> Vec<i64> {
        self.table
            .unique_values("ref_id")
            .iter()
            .filter_map(Value::as_i64)
            .collect()
    }

    /// Split the rows of `ref_id` (all rows when `None`) into sample groups.
    /// Unknown sample types are left out.
    pub fn dataset(&self, ref_id: Option<i64>) -> Dataset {
        let Some(samptype_idx) = self.table.column_index("samptype") else {
            warn!("Legacy dump has no 'samptype' column");
            return Dataset::new();
        };

        let mut groups: IndexMap<&'static str, Vec<Vec<Value>>> = IndexMap::new();
        for (i, row) in self.table.rows.iter().enumerate() {
            if let Some(id) = ref_id {
                if self.table.value(i, "ref_id").as_i64() != Some(id) {
                    continue;
                }
            }
            let group = match row[samptype_idx].as_str() {
                Some("Biota") => BIOTA,
                Some("Seawater") => SEAWATER,
                Some("Sediment") => SEDIMENT,
                Some("Suspended matter") => SUSPENDED_MATTER,
                _ => continue,
            };
            groups.entry(group).or_default().push(row.clone());
        }

        let mut dataset = Dataset::new();
        for (group, rows) in groups {
            dataset.insert(group, Table::new(self.table.columns.clone(), rows));
        }
        dataset
    }
}

/// Zotero key of a legacy dataset: last path segment of its `zoterourl`.
pub fn zotero_key(dataset: &Dataset) -> Option<String> {
    let (_, table) = dataset.iter().next()?;
    let url = table.value(0, "zoterourl").as_str()?;
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_helcom_merges_and_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("SEA02.csv"),
            "KEY,NUCLIDE,VALUE_Bq/m³\nS1,CS137,5.3\nS1,K40,2.0\nS2,CS137,1.1\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("SEA01.csv"),
            "KEY,YEAR,STATION\nS1,2012,0012\nS2,2013,B\n",
        )
        .unwrap();

        let (ds, report) = load_helcom(dir.path(), DEFAULT_SAMPLE_TYPES).unwrap();

        let sea = ds.get(SEAWATER).unwrap();
        assert_eq!(sea.row_count(), 3);
        assert_eq!(sea.value(1, "YEAR"), &Value::Number(2012.0));
        assert_eq!(sea.value(0, "STATION"), &Value::text("0012"));

        assert!(ds.get(SEDIMENT).unwrap().is_empty());
        assert!(ds.get(BIOTA).unwrap().is_empty());
        assert_eq!(report.notes.len(), 2);
        assert_eq!(report.sources.len(), 2);
    }

    #[test]
    fn test_legacy_dump_split_by_samptype() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.txt");
        fs::write(
            &path,
            "ref_id\tsamptype\tactivity\tzoterourl\n\
             100\tSeawater\t1.0\thttps://www.zotero.org/groups/2432820/maris/items/26VMZZ2Q\n\
             100\tBiota\t2.0\t\n\
             9999\tSeawater\t3.0\t\n\
             101\tSediment\t4.0\t\n",
        )
        .unwrap();

        let dump = LegacyDump::load(&path, &[DEFAULT_EXCLUDED_REF_ID]).unwrap();
        assert_eq!(dump.ref_ids(), vec![100, 101]);

        let ds = dump.dataset(Some(100));
        assert_eq!(ds.group_names(), vec!["seawater", "biota"]);
        assert_eq!(zotero_key(&ds).as_deref(), Some("26VMZZ2Q"));
    }
}
