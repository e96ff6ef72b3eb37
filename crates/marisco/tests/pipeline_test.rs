//! Integration tests composing library steps into pipelines.

use marisco::pipeline::{Pipeline, Transformer};
use marisco::remap::{MemoryCache, Remapper, fixes, shared};
use marisco::steps::{
    AddNuclideIdColumn, DropNaColumns, EncodeTime, LowerStripName, ParseTime, RemapNuclideName,
    SelectAndRenameColumns,
};
use marisco::table::{BIOTA, Dataset, SEAWATER, Table};
use marisco::vocab::{StaticVocabulary, UNMATCHED_ID};
use marisco::{MariscoError, Value};

fn nuclides() -> StaticVocabulary {
    StaticVocabulary::from_pairs("nuclides", &[(33, "cs137"), (22, "cs134_137_tot"), (4, "k40")])
}

fn seawater() -> Dataset {
    Dataset::new().with_group(
        SEAWATER,
        Table::from_rows(
            ["KEY", "NUCLIDE", "DATE", "YEAR", "MONTH", "DAY", "EMPTY"],
            vec![
                vec!["S1".into(), "CS137".into(), "05/23/12 00:00:00".into(), Value::Missing, Value::Missing, Value::Missing, Value::Missing],
                vec!["S2".into(), "CS134137".into(), Value::Missing, Value::Number(2012.0), Value::Number(0.0), Value::Number(0.0), Value::Missing],
                vec!["S3".into(), "k-40".into(), Value::Missing, Value::Missing, Value::Missing, Value::Missing, Value::Missing],
            ],
        ),
    )
}

fn remap_nuclides() -> RemapNuclideName {
    let cache = shared(MemoryCache::new());
    let fix = fixes(&[("cs134137", "cs134_137_tot"), ("k-40", "k40")]);
    RemapNuclideName::new(move |values| {
        Remapper::from_values(values, nuclides(), "nuclides", cache.clone())
            .generate_lookup_table(&fix, false)
    })
}

// =============================================================================
// Step ordering
// =============================================================================

#[test]
fn test_nuclide_ids_need_remapped_names() {
    let pipeline = Pipeline::new()
        .with_step(LowerStripName::new("NUCLIDE"))
        .with_step(remap_nuclides())
        .with_step(AddNuclideIdColumn::new("NUCLIDE", nuclides()));
    let mut transformer = Transformer::new(seawater(), pipeline);
    transformer.run().expect("Run failed");

    let t = transformer.dataset().get(SEAWATER).expect("No seawater");
    let ids: Vec<&Value> = (0..3).map(|i| t.value(i, "nuclide_id")).collect();
    assert_eq!(ids, vec![&Value::from(33i64), &Value::from(22i64), &Value::from(4i64)]);
}

#[test]
fn test_ids_before_remapping_are_unmatched() {
    let pipeline = Pipeline::new()
        .with_step(LowerStripName::new("NUCLIDE"))
        .with_step(AddNuclideIdColumn::new("NUCLIDE", nuclides()))
        .with_step(remap_nuclides());
    let mut transformer = Transformer::new(seawater(), pipeline);
    transformer.run().expect("Run failed");

    let t = transformer.dataset().get(SEAWATER).expect("No seawater");
    assert_eq!(t.value(0, "nuclide_id"), &Value::from(33i64));
    assert_eq!(t.value(1, "nuclide_id"), &Value::from(UNMATCHED_ID));
    assert!(
        transformer
            .log()
            .notes_for("AddNuclideIdColumn")
            .any(|n| n.message.contains("cs134137"))
    );
}

#[test]
fn test_time_is_parsed_then_encoded() {
    let pipeline = Pipeline::new().with_step(ParseTime).with_step(EncodeTime::default());
    let mut transformer = Transformer::new(seawater(), pipeline);
    let report = transformer.run().expect("Run failed");

    let t = transformer.dataset().get(SEAWATER).expect("No seawater");
    // S3 has neither DATE nor YEAR.
    assert_eq!(t.row_count(), 2);
    assert_eq!(t.value(0, "time"), &Value::Number(1337731200.0));
    // A zero month and day read as January 1st.
    assert_eq!(t.value(1, "time"), &Value::Number(1325376000.0));
    assert_eq!(report.rows_dropped(), 1);
    assert_eq!(transformer.log().entries().len(), 2);
}

// =============================================================================
// Column selection
// =============================================================================

#[test]
fn test_unknown_target_leaves_columns_untouched() {
    let pipeline = Pipeline::new().with_step(SelectAndRenameColumns::new("parquet"));
    let mut transformer = Transformer::new(seawater(), pipeline);
    transformer.run().expect("Run failed");

    let t = transformer.dataset().get(SEAWATER).expect("No seawater");
    assert_eq!(t.column_count(), 7);
    assert_eq!(transformer.log().notes().len(), 1);
}

#[test]
fn test_drop_all_missing_columns() {
    let pipeline = Pipeline::new().with_step(DropNaColumns::default());
    let mut transformer = Transformer::new(seawater(), pipeline);
    transformer.run().expect("Run failed");

    let t = transformer.dataset().get(SEAWATER).expect("No seawater");
    assert!(!t.has_column("EMPTY"));
    assert!(t.has_column("DATE"));
}

// =============================================================================
// Structural errors
// =============================================================================

#[test]
fn test_missing_group_aborts_with_earlier_changes_kept() {
    use marisco::steps::{Remap, StaticLookup};

    let pipeline = Pipeline::new()
        .with_step(LowerStripName::new("NUCLIDE"))
        .with_step(Remap::new(StaticLookup::default(), "species", "RUBIN", &[BIOTA]))
        .with_step(DropNaColumns::default());
    let mut transformer = Transformer::new(seawater(), pipeline);

    let err = transformer.run().expect_err("Run should fail");
    assert!(matches!(err, MariscoError::MissingGroup { ref group, .. } if group == BIOTA));

    let t = transformer.dataset().get(SEAWATER).expect("No seawater");
    assert_eq!(t.value(0, "NUCLIDE"), &Value::text("cs137"));
    assert!(t.has_column("EMPTY"));
}
