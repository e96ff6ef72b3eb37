//! Domain transformation steps.
//!
//! Each step is a small config struct implementing
//! [`TransformStep`](crate::pipeline::TransformStep). Steps repair or drop
//! what they can and record it in the transformation log; only structural
//! problems such as a missing required group are returned as errors.

mod columns;
mod coords;
mod lookup;
mod measurement;
mod nuclide;
mod remap;
mod reshape;
mod sample;
mod time;

pub use columns::{
    DropNaColumns, EncodingTarget, RenameColumns, RenamingRules, Rules, SelectAndRenameColumns,
    SelectColumns, select_and_rename,
};
pub use coords::{ParseCoordinates, SanitizeLonLat, ddmm_to_dd, parse_ddmm};
pub use lookup::{
    AttributeLookup, IdLookup, IdLookupSource, Lookup, RemapperLookup, StaticLookup, match_ids,
    text_lookup,
};
pub use measurement::{
    DETECTED, DETECTION_NOT_AVAILABLE, MeasurementColumns, MeasurementCoi, NormalizeUncertainty,
    RemapDetectionLimit, RemapUnit, SanitizeDetectionLimit, SanitizeValue, UnitRules,
    relative_to_absolute,
};
pub use nuclide::{AddNuclideIdColumn, LowerStripName, RemapNuclideName, lower_strip};
pub use remap::{
    Remap, RemapSediment, RemapTaxonInformation, SedimentRules, TAXON_COLUMNS, UNKNOWN_TAXON,
};
pub use reshape::{DEFAULT_VALUE_COLUMNS, ReshapeLongToWide};
pub use sample::{
    AddMeasurementNote, AddSampleLabCode, AddSampleTypeIdColumn, CastStationToString,
    LookupDryWetRatio, RemapFiltered, RemapSedSliceTopBottom, RemapStationId, UniqueIndex,
    sample_type_id,
};
pub use time::{
    EncodeTime, HELCOM_DATE_FORMAT, ParseIsoTime, ParseTime, encode_time, parse_composite_date,
    parse_iso_time, parse_partial_date,
};
