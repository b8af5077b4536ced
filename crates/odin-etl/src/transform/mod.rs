//! Normalization of raw tables into the canonical star-schema shape
//!
//! Normalizers never touch their input; each returns a new table.

pub mod dimension;
pub mod fact;

pub use dimension::{normalize_dimension, DimensionRecord, DimensionTable};
pub use fact::{
    derive_fact_id, normalize_facts, parse_metric, FactKeys, FactMetrics, FactRecord, FactTable,
};
