//! ODIN mobility survey ETL
//!
//! Reads the survey's sectioned metadata document and its fact table,
//! normalizes both into a star schema, checks structural and referential
//! integrity, and merges the result into PostgreSQL.
//!
//! # Pipeline
//!
//! - [`metadata::MetadataParser`] splits the metadata document into named tables
//! - [`transform::normalize_dimension`] and [`transform::normalize_facts`] produce
//!   canonical tables; fact rows get a content-derived `fact_id`
//! - [`validate::validate_all`] checks every dimension, then the facts
//! - [`load::UpsertTarget`] merges each table in its own transaction
//! - [`pipeline::EtlPipeline`] sequences the stages and reports a [`RunResult`]

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod load;
pub mod metadata;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod table;
pub mod transform;
pub mod validate;

pub use error::{EtlError, Result};
pub use load::{PgUpsertTarget, UpsertTarget};
pub use pipeline::{EtlPipeline, PipelineError, RunResult, Stage};
pub use table::RawTable;
