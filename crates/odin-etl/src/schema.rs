//! Fixed vocabulary of the mobility star schema
//!
//! Source section names, persisted table names and the column mappings are
//! static data. Components receive them from here explicitly.

/// Persisted fact table
pub const FACT_TABLE: &str = "fact_mobility";

/// Token the survey publishes for "no observation" in metric cells
pub const NULL_SENTINEL: &str = ".";

/// Separator between foreign-key values when deriving `fact_id`
pub const FACT_ID_SEPARATOR: &str = "|";

/// Default field separator of both source files
pub const DEFAULT_SEPARATOR: u8 = b';';

/// One dimension of the survey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionSpec {
    /// Section name in the metadata document, also the fact source column
    pub section: &'static str,
    /// Persisted table name (without schema prefix)
    pub table: &'static str,
    /// Canonical foreign-key column in the fact table
    pub fact_column: &'static str,
}

/// The six dimensions, in the fixed foreign-key order used by `fact_id`
pub const DIMENSIONS: [DimensionSpec; 6] = [
    DimensionSpec {
        section: "TravelMotives",
        table: "dim_travel_motives",
        fact_column: "travel_motive_key",
    },
    DimensionSpec {
        section: "Population",
        table: "dim_population",
        fact_column: "population_key",
    },
    DimensionSpec {
        section: "TravelModes",
        table: "dim_travel_modes",
        fact_column: "travel_mode_key",
    },
    DimensionSpec {
        section: "Margins",
        table: "dim_margins",
        fact_column: "margin_key",
    },
    DimensionSpec {
        section: "RegionCharacteristics",
        table: "dim_regions",
        fact_column: "region_key",
    },
    DimensionSpec {
        section: "Periods",
        table: "dim_periods",
        fact_column: "period_key",
    },
];

/// Canonical metric columns with their coded source labels
pub const METRICS: [(&str, &str); 6] = [
    ("Trips_1", "trips_daily"),
    ("DistanceTravelled_2", "distance_daily"),
    ("TimeTravelled_3", "time_daily"),
    ("Trips_4", "trips_yearly"),
    ("DistanceTravelled_5", "distance_yearly"),
    ("TimeTravelled_6", "time_yearly"),
];

/// Canonical dimension columns
pub mod dimension_columns {
    pub const KEY: &str = "key";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const INGESTED_AT: &str = "ingested_at";
}

pub const FACT_ID: &str = "fact_id";
pub const INGESTED_AT: &str = "ingested_at";

/// Look up a dimension by its metadata section name
pub fn dimension_by_section(section: &str) -> Option<&'static DimensionSpec> {
    DIMENSIONS.iter().find(|d| d.section == section)
}

/// Canonical name for a dimension source column, if it is one of the known ones
///
/// Matching ignores ASCII case; `desc` is accepted as an abbreviation of
/// `description`.
pub fn canonical_dimension_column(source: &str) -> Option<&'static str> {
    match source.trim().to_ascii_lowercase().as_str() {
        "key" => Some(dimension_columns::KEY),
        "title" => Some(dimension_columns::TITLE),
        "description" | "desc" => Some(dimension_columns::DESCRIPTION),
        _ => None,
    }
}

/// Canonical name for a fact source column, if the fact table keeps it
pub fn canonical_fact_column(source: &str) -> Option<&'static str> {
    let source = source.trim();
    DIMENSIONS
        .iter()
        .find(|d| d.section == source || d.fact_column == source)
        .map(|d| d.fact_column)
        .or_else(|| {
            METRICS
                .iter()
                .find(|(label, canonical)| *label == source || *canonical == source)
                .map(|(_, canonical)| *canonical)
        })
}
