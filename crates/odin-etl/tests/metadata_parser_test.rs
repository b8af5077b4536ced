//! Metadata document parsing against realistic survey layouts

mod common;

use common::{init_test_tracing, METADATA_FIXTURE};
use odin_etl::metadata::MetadataParser;
use odin_etl::table::TableError;
use odin_etl::EtlError;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_parse_survey_metadata() {
    init_test_tracing();

    let parsed = MetadataParser::new(b';').parse_str(METADATA_FIXTURE).unwrap();

    assert_eq!(
        parsed.section_names().collect::<Vec<_>>(),
        [
            "TableInfos",
            "DataProperties",
            "TravelMotives",
            "Population",
            "TravelModes",
            "Margins",
            "RegionCharacteristics",
            "Periods"
        ]
    );
    assert!(parsed.failures().is_empty());

    let motives = parsed.get("TravelMotives").unwrap();
    assert_eq!(motives.columns(), ["Key", "Title", "Description", "CategoryGroupID"]);
    assert_eq!(motives.len(), 2);
    assert_eq!(motives.cell(0, 1), Some("Travelling to/from work"));
    // Quoted empty fields are null
    assert_eq!(motives.cell(1, 2), None);

    let table_infos = parsed.get("TableInfos").unwrap();
    assert_eq!(
        table_infos.cell(0, 1),
        Some("Mobility; per trip, travel motive and travel mode")
    );
}

#[test]
fn test_periods_example() {
    let text = "\"Periods\"\nkey;title;desc\n2023JJ00;Year 2023;Full year\n";
    let parsed = MetadataParser::new(b';').parse_str(text).unwrap();

    let periods = parsed.get("Periods").unwrap();
    assert_eq!(periods.columns(), ["key", "title", "desc"]);
    assert_eq!(periods.len(), 1);
    assert_eq!(periods.cell(0, 0), Some("2023JJ00"));
    assert_eq!(periods.cell(0, 1), Some("Year 2023"));
    assert_eq!(periods.cell(0, 2), Some("Full year"));
}

#[test]
fn test_malformed_section_is_skipped() {
    init_test_tracing();

    let text = concat!(
        "\"Margins\"\n",
        "Key;Title\n",
        "MW00000;Value\n",
        "\"Population\"\n",
        "Key;Title\n",
        "A048710;Total;unexpected;fields\n",
        "\"Periods\"\n",
        "Key;Title\n",
        "2023JJ00;2023\n",
    );

    let parsed = MetadataParser::new(b';').parse_str(text).unwrap();

    assert_eq!(parsed.section_names().collect::<Vec<_>>(), ["Margins", "Periods"]);
    assert_eq!(parsed.failures().len(), 1);
    assert_eq!(parsed.failures()[0].section, "Population");
    assert!(matches!(parsed.failures()[0].error, TableError::RaggedRow { .. }));
}

#[test]
fn test_bom_and_crlf() {
    let text = "\u{feff}\"Periods\"\r\nKey;Title\r\n2023JJ00;2023\r\n\r\n\"Margins\"\r\nKey;Title\r\nMW00000;Value\r\n";
    let parsed = MetadataParser::new(b';').parse_str(text).unwrap();

    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed.get("Periods").unwrap().cell(0, 1), Some("2023"));
    assert_eq!(parsed.get("Margins").unwrap().cell(0, 0), Some("MW00000"));
}

#[test]
fn test_custom_separator() {
    let text = "\"Periods\"\nKey,Title\n2023JJ00,\"2023, final\"\n";
    let parsed = MetadataParser::new(b',').parse_str(text).unwrap();
    assert_eq!(parsed.get("Periods").unwrap().cell(0, 1), Some("2023, final"));
}

#[test]
fn test_parse_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(METADATA_FIXTURE.as_bytes()).unwrap();

    let parsed = MetadataParser::new(b';').parse_file(file.path()).unwrap();
    assert_eq!(parsed.len(), 8);
}

#[test]
fn test_duplicate_section_is_rejected() {
    let text = "\"Periods\"\nKey;Title\nA;a\n\n\"Periods\"\nKey;Title\nB;b\n";
    let err = MetadataParser::new(b';').parse_str(text).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Metadata section 'Periods' is declared more than once"
    );
    assert!(matches!(err, EtlError::DuplicateSection(_)));
}

#[test]
fn test_document_without_sections() {
    let parsed = MetadataParser::new(b';').parse_str("Key;Title\nA;a\n").unwrap();
    assert!(parsed.is_empty());
    assert!(parsed.failures().is_empty());
}
