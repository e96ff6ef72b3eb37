//! Dataset-level metadata derived from the harmonized data.

use chrono::DateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::input::SourceMetadata;
use crate::pipeline::TransformLog;
use crate::table::{Dataset, Value};
use crate::vocab::Vocabulary;

/// Column names searched for each coordinate, across the output encodings.
const LAT_COLUMNS: &[&str] = &["lat", "latitude", "LAT"];
const LON_COLUMNS: &[&str] = &["lon", "longitude", "LON"];
const DEPTH_COLUMNS: &[&str] = &["smp_depth", "sampdepth", "SMP_DEPTH"];
const TIME_COLUMNS: &[&str] = &["time", "begperiod", "TIME"];

/// Global attributes written alongside an encoded dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geospatial_lat_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geospatial_lat_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geospatial_lon_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geospatial_lon_max: Option<f64>,
    /// Bounding box as a WKT polygon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geospatial_bounds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geospatial_vertical_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geospatial_vertical_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_coverage_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_coverage_end: Option<String>,
    /// Zotero record key of the source publication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub keywords: String,
    pub publisher_postprocess_logs: String,
    /// Provenance of the files the dataset was read from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceMetadata>,
    /// Subsets of large enumerations (species, body parts) actually used.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub enums: IndexMap<String, IndexMap<String, i64>>,
}

impl GlobalAttributes {
    /// Compute extents over every group.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let (lat_min, lat_max) = range(dataset, LAT_COLUMNS);
        let (lon_min, lon_max) = range(dataset, LON_COLUMNS);
        let (depth_min, depth_max) = range(dataset, DEPTH_COLUMNS);
        let (time_min, time_max) = range(dataset, TIME_COLUMNS);

        let geospatial_bounds = match (lat_min, lat_max, lon_min, lon_max) {
            (Some(lat_min), Some(lat_max), Some(lon_min), Some(lon_max)) => Some(format!(
                "POLYGON (({lon_min} {lat_min}, {lon_max} {lat_min}, {lon_max} {lat_max}, {lon_min} {lat_max}, {lon_min} {lat_min}))"
            )),
            _ => None,
        };

        Self {
            geospatial_lat_min: lat_min,
            geospatial_lat_max: lat_max,
            geospatial_lon_min: lon_min,
            geospatial_lon_max: lon_max,
            geospatial_bounds,
            geospatial_vertical_min: depth_min,
            geospatial_vertical_max: depth_max,
            time_coverage_start: time_min.and_then(iso_time),
            time_coverage_end: time_max.and_then(iso_time),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_keywords<S: AsRef<str>>(mut self, keywords: &[S]) -> Self {
        self.keywords = keywords
            .iter()
            .map(|k| k.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
        self
    }

    /// Record the steps that produced the data and the caveats they raised.
    pub fn with_log(mut self, log: &TransformLog) -> Self {
        self.publisher_postprocess_logs = log.joined();
        self
    }

    pub fn with_sources(mut self, sources: &[SourceMetadata]) -> Self {
        self.sources = sources.to_vec();
        self
    }

    pub fn with_enum(mut self, name: impl Into<String>, subset: IndexMap<String, i64>) -> Self {
        if !subset.is_empty() {
            self.enums.insert(name.into(), subset);
        }
        self
    }
}

/// Min and max of the first candidate column present in each group.
///
/// Dates count as seconds since the epoch so that encoded and unencoded
/// time columns compare alike.
fn range(dataset: &Dataset, candidates: &[&str]) -> (Option<f64>, Option<f64>) {
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    for (_, table) in dataset.iter() {
        let Some(column) = candidates.iter().find_map(|c| table.column(c)) else {
            continue;
        };
        for value in column {
            let n = match value {
                Value::Date(d) => Some(d.and_utc().timestamp() as f64),
                other => other.as_f64(),
            };
            if let Some(n) = n {
                min = Some(min.map_or(n, |m| m.min(n)));
                max = Some(max.map_or(n, |m| m.max(n)));
            }
        }
    }
    (min, max)
}

fn iso_time(seconds: f64) -> Option<String> {
    DateTime::from_timestamp(seconds as i64, 0).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// `name -> id` for the ids of `vocabulary` that occur in `values`.
///
/// Sentinel and unknown ids are left out.
pub fn enum_subset(values: &[Value], vocabulary: &Vocabulary) -> IndexMap<String, i64> {
    let mut subset: Vec<(String, i64)> = values
        .iter()
        .filter_map(Value::as_i64)
        .filter_map(|id| vocabulary.by_id(id))
        .filter(|e| !crate::vocab::is_sentinel(e.id))
        .map(|e| (e.name.clone(), e.id))
        .collect();
    subset.sort_by_key(|(_, id)| *id);
    subset.dedup();
    subset.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{BIOTA, SEAWATER, Table};
    use crate::vocab::VocabularyEntry;

    fn dataset() -> Dataset {
        Dataset::new()
            .with_group(
                SEAWATER,
                Table::from_rows(
                    ["lat", "lon", "smp_depth", "time"],
                    vec![
                        vec![Value::Number(54.0), Value::Number(10.0), Value::Number(5.0), Value::Number(0.0)],
                        vec![Value::Number(60.5), Value::Number(25.0), Value::Missing, Value::Number(86_400.0)],
                    ],
                ),
            )
            .with_group(
                BIOTA,
                Table::from_rows(
                    ["lat", "lon", "time"],
                    vec![vec![Value::Number(55.0), Value::Number(-3.0), Value::Number(3_600.0)]],
                ),
            )
    }

    #[test]
    fn test_extents_across_groups() {
        let attrs = GlobalAttributes::from_dataset(&dataset());
        assert_eq!(attrs.geospatial_lat_min, Some(54.0));
        assert_eq!(attrs.geospatial_lat_max, Some(60.5));
        assert_eq!(attrs.geospatial_lon_min, Some(-3.0));
        assert_eq!(attrs.geospatial_vertical_max, Some(5.0));
        assert_eq!(attrs.time_coverage_start.as_deref(), Some("1970-01-01T00:00:00"));
        assert_eq!(attrs.time_coverage_end.as_deref(), Some("1970-01-02T00:00:00"));
        assert_eq!(
            attrs.geospatial_bounds.as_deref(),
            Some("POLYGON ((-3 54, 25 54, 25 60.5, -3 60.5, -3 54))")
        );
    }

    #[test]
    fn test_empty_dataset_has_no_extents() {
        let attrs = GlobalAttributes::from_dataset(&Dataset::new())
            .with_id("26VMZZ2Q")
            .with_keywords(&["oceanography", "radionuclides"]);
        assert!(attrs.geospatial_bounds.is_none());
        assert_eq!(attrs.keywords, "oceanography, radionuclides");
        assert_eq!(attrs.id.as_deref(), Some("26VMZZ2Q"));
    }

    #[test]
    fn test_log_publishes_unmatched_nuclides() {
        use crate::pipeline::{Pipeline, Transformer};
        use crate::steps::{AddNuclideIdColumn, LowerStripName};
        use crate::vocab::StaticVocabulary;

        let ds = Dataset::new().with_group(
            SEAWATER,
            Table::from_rows(["NUCLIDE"], vec![vec!["CS134137".into()], vec!["CS137".into()]]),
        );
        let pipeline = Pipeline::new()
            .with_step(LowerStripName::new("NUCLIDE"))
            .with_step(AddNuclideIdColumn::new(
                "NUCLIDE",
                StaticVocabulary::from_pairs("nuclides", &[(33, "cs137")]),
            ));
        let mut tfm = Transformer::new(ds, pipeline);
        tfm.run().unwrap();

        let attrs = GlobalAttributes::from_dataset(tfm.dataset()).with_log(tfm.log());
        assert!(attrs.publisher_postprocess_logs.starts_with("Convert 'NUCLIDE'"));
        assert!(attrs.publisher_postprocess_logs.contains("cs134137"));
    }

    #[test]
    fn test_enum_subset() {
        let vocab = Vocabulary::new(vec![
            VocabularyEntry::new(0, "(Not available)"),
            VocabularyEntry::new(99, "Gadus morhua"),
            VocabularyEntry::new(12, "Mytilus edulis"),
        ]);
        let values = vec![Value::Number(99.0), Value::Number(12.0), Value::Number(99.0), Value::Number(0.0), Value::Number(-1.0)];
        let subset = enum_subset(&values, &vocab);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.get_index(0), Some((&"Mytilus edulis".to_string(), &12)));
    }
}
