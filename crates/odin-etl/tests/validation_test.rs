//! Integrity checks across dimensions and facts

mod common;

use chrono::Utc;
use odin_etl::schema::DIMENSIONS;
use odin_etl::transform::{normalize_dimension, DimensionTable, FactKeys, FactRecord, FactTable};
use odin_etl::validate::{validate_all, validate_dimension, validate_facts, Rule};
use odin_etl::RawTable;

fn dimension(section: &str, keys: &[&str]) -> DimensionTable {
    let rows = keys.iter().map(|k| vec![Some(*k), Some("label")]).collect();
    let raw = RawTable::from_rows(["Key", "Title"], rows).unwrap();
    normalize_dimension(section, &raw, Utc::now())
}

/// One dimension per section holding the keys of [`fact`]
fn complete_dimensions() -> Vec<DimensionTable> {
    let keys = ["TM1", "P1", "M1", "MG1", "R1", "2023JJ00"];
    DIMENSIONS
        .iter()
        .zip(keys)
        .map(|(spec, key)| dimension(spec.section, &[key]))
        .collect()
}

fn fact(keys: [&str; 6]) -> FactRecord {
    FactRecord::new(FactKeys::from_array(keys.map(str::to_string)), Default::default())
}

fn facts(records: Vec<FactRecord>) -> FactTable {
    FactTable::new(records, Utc::now())
}

#[test]
fn test_consistent_tables_pass() {
    common::init_test_tracing();

    let dimensions = complete_dimensions();
    let facts = facts(vec![fact(["TM1", "P1", "M1", "MG1", "R1", "2023JJ00"])]);
    assert!(validate_all(&dimensions, &facts).is_ok());
}

#[test]
fn test_duplicate_dimension_key() {
    let periods = dimension("Periods", &["2023JJ00", "2022JJ00", "2023JJ00"]);
    let err = validate_dimension(&periods).unwrap_err();

    assert_eq!(err.table, "Periods");
    assert_eq!(err.rule, Rule::Unique);
    assert_eq!(err.rows, vec![2]);
}

#[test]
fn test_orphan_fact_then_fixed() {
    let mut dimensions = complete_dimensions();
    let facts = facts(vec![
        fact(["TM1", "P1", "M1", "MG1", "R1", "2023JJ00"]),
        fact(["TM1", "P1", "M1", "MG1", "R1", "2024JJ00"]),
    ]);

    let err = validate_all(&dimensions, &facts).unwrap_err();
    assert_eq!(err.table, "fact_mobility");
    assert_eq!(err.column, "period_key");
    assert_eq!(
        err.rule,
        Rule::ForeignKey {
            dimension: "dim_periods".to_string()
        }
    );
    assert_eq!(err.rows, vec![1]);
    assert_eq!(err.values, vec!["2024JJ00".to_string()]);

    let periods = dimensions.last_mut().unwrap();
    assert_eq!(periods.name(), "Periods");
    *periods = dimension("Periods", &["2023JJ00", "2024JJ00"]);

    assert!(validate_all(&dimensions, &facts).is_ok());
}

#[test]
fn test_empty_foreign_key_is_orphan() {
    let dimensions = complete_dimensions();
    let facts = facts(vec![fact(["TM1", "P1", "", "MG1", "R1", "2023JJ00"])]);

    let err = validate_facts(&facts, &dimensions).unwrap_err();
    assert_eq!(err.column, "travel_mode_key");
    assert_eq!(err.rows, vec![0]);
}

#[test]
fn test_first_failing_table_is_reported() {
    let mut dimensions = complete_dimensions();
    dimensions[1] = dimension("Population", &["P1", "P1"]);
    dimensions[4] = dimension("RegionCharacteristics", &["R1", "R1"]);
    let facts = facts(vec![fact(["X", "X", "X", "X", "X", "X"])]);

    let err = validate_all(&dimensions, &facts).unwrap_err();
    assert_eq!(err.table, "Population");
    assert_eq!(err.rule, Rule::Unique);
}

#[test]
fn test_missing_dimension_is_reported() {
    let dimensions: Vec<_> = complete_dimensions()
        .into_iter()
        .filter(|d| d.name() != "Margins")
        .collect();
    let facts = facts(vec![fact(["TM1", "P1", "M1", "MG1", "R1", "2023JJ00"])]);

    let err = validate_all(&dimensions, &facts).unwrap_err();
    assert_eq!(err.column, "margin_key");
    assert_eq!(err.rule, Rule::DimensionAvailable);
}

#[test]
fn test_foreign_keys_checked_in_column_order() {
    let dimensions = complete_dimensions();
    let facts = facts(vec![fact(["TM1", "bad", "M1", "MG1", "R1", "bad"])]);

    let err = validate_facts(&facts, &dimensions).unwrap_err();
    assert_eq!(err.column, "population_key");
}

#[test]
fn test_empty_fact_table_passes() {
    let dimensions = complete_dimensions();
    assert!(validate_facts(&facts(Vec::new()), &dimensions).is_ok());
}
