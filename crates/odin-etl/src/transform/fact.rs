//! Fact normalizer and fact identity
//!
//! Steps, in order:
//!
//! 1. Map source columns to the six foreign keys and six metrics, dropping the rest
//! 2. Trim foreign-key values
//! 3. Parse metrics; the `.` sentinel and unparseable tokens become null
//! 4. Derive `fact_id` from the trimmed foreign keys
//! 5. Stamp `ingested_at`
//!
//! `fact_id` is the lowercase hex MD5 of the six foreign keys joined by `|` in
//! [`DIMENSIONS`] order. Other systems recompute it, so neither the digest nor
//! the separator may change.

use chrono::{DateTime, Utc};
use odin_common::checksum::md5_hex;
use serde::Serialize;

use crate::error::{EtlError, Result};
use crate::schema::{
    canonical_fact_column, DIMENSIONS, FACT_ID, FACT_ID_SEPARATOR, FACT_TABLE, INGESTED_AT, METRICS,
    NULL_SENTINEL,
};
use crate::table::RawTable;

/// Foreign keys of one fact row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FactKeys {
    pub travel_motive_key: String,
    pub population_key: String,
    pub travel_mode_key: String,
    pub margin_key: String,
    pub region_key: String,
    pub period_key: String,
}

impl FactKeys {
    /// Keys in [`DIMENSIONS`] order
    pub fn as_array(&self) -> [&str; 6] {
        [
            self.travel_motive_key.as_str(),
            self.population_key.as_str(),
            self.travel_mode_key.as_str(),
            self.margin_key.as_str(),
            self.region_key.as_str(),
            self.period_key.as_str(),
        ]
    }

    /// Keys given in [`DIMENSIONS`] order
    pub fn from_array(keys: [String; 6]) -> Self {
        let [travel_motive_key, population_key, travel_mode_key, margin_key, region_key, period_key] =
            keys;
        Self {
            travel_motive_key,
            population_key,
            travel_mode_key,
            margin_key,
            region_key,
            period_key,
        }
    }
}

/// Measures of one fact row
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FactMetrics {
    pub trips_daily: Option<f64>,
    pub distance_daily: Option<f64>,
    pub time_daily: Option<f64>,
    pub trips_yearly: Option<f64>,
    pub distance_yearly: Option<f64>,
    pub time_yearly: Option<f64>,
}

impl FactMetrics {
    /// Metrics in [`METRICS`] order
    pub fn as_array(&self) -> [Option<f64>; 6] {
        [
            self.trips_daily,
            self.distance_daily,
            self.time_daily,
            self.trips_yearly,
            self.distance_yearly,
            self.time_yearly,
        ]
    }

    pub fn from_array(metrics: [Option<f64>; 6]) -> Self {
        let [trips_daily, distance_daily, time_daily, trips_yearly, distance_yearly, time_yearly] =
            metrics;
        Self {
            trips_daily,
            distance_daily,
            time_daily,
            trips_yearly,
            distance_yearly,
            time_yearly,
        }
    }
}

/// One canonical fact row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRecord {
    pub fact_id: String,
    #[serde(flatten)]
    pub keys: FactKeys,
    #[serde(flatten)]
    pub metrics: FactMetrics,
}

impl FactRecord {
    /// Build a row, deriving its identity from the keys
    pub fn new(keys: FactKeys, metrics: FactMetrics) -> Self {
        Self {
            fact_id: derive_fact_id(&keys),
            keys,
            metrics,
        }
    }
}

/// Canonical fact table
#[derive(Debug, Clone, PartialEq)]
pub struct FactTable {
    rows: Vec<FactRecord>,
    ingested_at: DateTime<Utc>,
}

impl FactTable {
    /// Canonical column order
    pub const COLUMNS: [&'static str; 14] = [
        FACT_ID,
        DIMENSIONS[0].fact_column,
        DIMENSIONS[1].fact_column,
        DIMENSIONS[2].fact_column,
        DIMENSIONS[3].fact_column,
        DIMENSIONS[4].fact_column,
        DIMENSIONS[5].fact_column,
        METRICS[0].1,
        METRICS[1].1,
        METRICS[2].1,
        METRICS[3].1,
        METRICS[4].1,
        METRICS[5].1,
        INGESTED_AT,
    ];

    pub fn new(rows: Vec<FactRecord>, ingested_at: DateTime<Utc>) -> Self {
        Self { rows, ingested_at }
    }

    pub fn rows(&self) -> &[FactRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }
}

/// Derive the identity of a fact row from its foreign keys
pub fn derive_fact_id(keys: &FactKeys) -> String {
    md5_hex(keys.as_array().join(FACT_ID_SEPARATOR))
}

/// Parse one metric cell
///
/// Surrounding whitespace is ignored. The `.` sentinel, empty cells and
/// anything that is not a number yield `None`.
pub fn parse_metric(cell: Option<&str>) -> Option<f64> {
    let value = cell?.trim();
    if value == NULL_SENTINEL {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Normalize the raw fact table
///
/// All six foreign-key columns must be present, under either their source or
/// canonical names. Missing metric columns yield null metrics.
pub fn normalize_facts(raw: &RawTable, ingested_at: DateTime<Utc>) -> Result<FactTable> {
    let mut keys_at = [0usize; 6];
    for (slot, dimension) in keys_at.iter_mut().zip(DIMENSIONS.iter()) {
        *slot = source_index(raw, dimension.fact_column).ok_or_else(|| {
            let column = format!("{} ({})", dimension.fact_column, dimension.section);
            EtlError::missing_column(FACT_TABLE, column)
        })?;
    }

    let metrics_at = METRICS.map(|(_, canonical)| source_index(raw, canonical));

    let rows = raw
        .rows()
        .iter()
        .map(|row| {
            let keys = FactKeys::from_array(
                keys_at.map(|i| row[i].as_deref().map(str::trim).unwrap_or_default().to_string()),
            );
            let metrics = FactMetrics::from_array(
                metrics_at.map(|index| index.and_then(|i| parse_metric(row[i].as_deref()))),
            );
            FactRecord::new(keys, metrics)
        })
        .collect();

    Ok(FactTable::new(rows, ingested_at))
}

/// Position of the first source column mapping to `canonical`
fn source_index(raw: &RawTable, canonical: &str) -> Option<usize> {
    raw.columns()
        .iter()
        .position(|name| canonical_fact_column(name) == Some(canonical))
}
