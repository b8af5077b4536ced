//! Run orchestration
//!
//! A run moves through `Extracted -> Transformed -> Validated -> RunResult`.
//! Each stage consumes the previous one's value, so stages cannot be skipped
//! or repeated. Any failure stops the run and is reported with the stage it
//! happened in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use odin_common::checksum::fingerprint_file;
use odin_common::OdinError;

use crate::config::SourceConfig;
use crate::error::EtlError;
use crate::load::UpsertTarget;
use crate::metadata::MetadataParser;
use crate::schema::{dimension_by_section, DIMENSIONS, FACT_TABLE};
use crate::source::DataSource;
use crate::table::RawTable;
use crate::transform::{normalize_dimension, normalize_facts, DimensionTable, FactTable};
use crate::validate::validate_all;

/// Pipeline stage, used to attribute failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Transform,
    Validate,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Validate => "validate",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

/// A stage failure; the underlying error is kept unchanged
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: impl Into<EtlError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

type StageResult<T> = std::result::Result<T, PipelineError>;

/// Summary of one completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunResult {
    dimensions_loaded: BTreeMap<String, u64>,
    facts_loaded: u64,
    total_dimensions: u64,
}

impl RunResult {
    pub fn new(dimensions_loaded: BTreeMap<String, u64>, facts_loaded: u64) -> Self {
        let total_dimensions = dimensions_loaded.values().sum();
        Self {
            dimensions_loaded,
            facts_loaded,
            total_dimensions,
        }
    }

    /// Rows written per persisted dimension table
    pub fn dimensions_loaded(&self) -> &BTreeMap<String, u64> {
        &self.dimensions_loaded
    }

    pub fn facts_loaded(&self) -> u64 {
        self.facts_loaded
    }

    pub fn total_dimensions(&self) -> u64 {
        self.total_dimensions
    }
}

/// Entry point of a run
#[derive(Debug, Clone)]
pub struct EtlPipeline {
    source: SourceConfig,
}

impl EtlPipeline {
    pub fn new(source: SourceConfig) -> Self {
        Self { source }
    }

    /// Read both source documents
    pub fn extract(&self) -> StageResult<Extracted> {
        let fail = |e: EtlError| PipelineError::new(Stage::Extract, e);

        let metadata_path = self.source.metadata_path();

        info!("[EXTRACT] Reading metadata from {}", metadata_path.display());
        log_fingerprint(&metadata_path).map_err(fail)?;
        let parsed = MetadataParser::new(self.source.separator)
            .parse_file(&metadata_path)
            .map_err(fail)?;
        let section_failures = parsed.failures().len();

        let data = DataSource::new(self.source.data_path(), self.source.separator);
        info!("[EXTRACT] Reading facts from {}", data.path().display());
        log_fingerprint(data.path()).map_err(fail)?;
        let facts = data.read().map_err(fail)?;

        info!(
            sections = parsed.len(),
            skipped_sections = section_failures,
            fact_rows = facts.len(),
            "[EXTRACT] Completed"
        );

        Ok(Extracted {
            sections: parsed.into_sections(),
            facts,
            section_failures,
        })
    }

    /// Extract, transform and validate without writing anything
    pub fn check(&self) -> StageResult<Validated> {
        self.extract()?.transform()?.validate()
    }

    /// [`check`](Self::check) on the blocking pool
    ///
    /// The calling runtime keeps polling other futures, such as a shutdown
    /// signal, while the source files are read and checked. The outer error
    /// is only returned if the check task panicked or was cancelled.
    pub async fn check_async(&self) -> Result<StageResult<Validated>, JoinError> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.check()).await
    }

    /// Full run against `target`
    pub async fn run<T>(&self, target: &T) -> StageResult<RunResult>
    where
        T: UpsertTarget + ?Sized,
    {
        self.check()?.load(target).await
    }
}

fn log_fingerprint(path: &Path) -> crate::error::Result<()> {
    let fingerprint = fingerprint_file(path).map_err(|e| match e {
        OdinError::Io(source) => EtlError::io(path, source),
        other => EtlError::config(other.to_string()),
    })?;
    info!(
        file = %path.display(),
        sha256 = %fingerprint.sha256,
        size_bytes = fingerprint.size_bytes,
        "[EXTRACT] Source fingerprint"
    );
    Ok(())
}

/// Raw sections and the raw fact table
#[derive(Debug, Clone)]
pub struct Extracted {
    sections: Vec<(String, RawTable)>,
    facts: RawTable,
    section_failures: usize,
}

impl Extracted {
    pub fn from_parts(sections: Vec<(String, RawTable)>, facts: RawTable) -> Self {
        Self {
            sections,
            facts,
            section_failures: 0,
        }
    }

    pub fn sections(&self) -> &[(String, RawTable)] {
        &self.sections
    }

    pub fn facts(&self) -> &RawTable {
        &self.facts
    }

    /// Metadata sections dropped during parsing
    pub fn section_failures(&self) -> usize {
        self.section_failures
    }

    /// Normalize the known dimensions and the facts with one capture timestamp
    pub fn transform(self) -> StageResult<Transformed> {
        let ingested_at = Utc::now();

        for (name, _) in &self.sections {
            if dimension_by_section(name).is_none() {
                debug!(section = %name, "[TRANSFORM] Ignoring section without a dimension table");
            }
        }

        let mut dimensions = Vec::with_capacity(DIMENSIONS.len());
        for spec in &DIMENSIONS {
            match self.sections.iter().find(|(name, _)| name == spec.section) {
                Some((name, raw)) => {
                    let table = normalize_dimension(name, raw, ingested_at);
                    info!(section = %name, rows = table.len(), "[TRANSFORM] Normalized dimension");
                    dimensions.push(table);
                },
                None => warn!(section = spec.section, "[TRANSFORM] Dimension section missing"),
            }
        }

        let facts = normalize_facts(&self.facts, ingested_at)
            .map_err(|e| PipelineError::new(Stage::Transform, e))?;
        info!(rows = facts.len(), "[TRANSFORM] Normalized facts");

        Ok(Transformed {
            dimensions,
            facts,
            ingested_at,
        })
    }
}

/// Canonical tables awaiting validation
#[derive(Debug, Clone)]
pub struct Transformed {
    dimensions: Vec<DimensionTable>,
    facts: FactTable,
    ingested_at: DateTime<Utc>,
}

impl Transformed {
    pub fn dimensions(&self) -> &[DimensionTable] {
        &self.dimensions
    }

    pub fn facts(&self) -> &FactTable {
        &self.facts
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    /// Check every dimension, then the facts; stops at the first failing table
    pub fn validate(self) -> StageResult<Validated> {
        validate_all(&self.dimensions, &self.facts)
            .map_err(|e| PipelineError::new(Stage::Validate, e))?;

        info!(
            dimensions = self.dimensions.len(),
            fact_rows = self.facts.len(),
            "[VALIDATE] All tables passed"
        );

        Ok(Validated {
            dimensions: self.dimensions,
            facts: self.facts,
        })
    }
}

/// Tables that passed validation
#[derive(Debug, Clone)]
pub struct Validated {
    dimensions: Vec<DimensionTable>,
    facts: FactTable,
}

impl Validated {
    pub fn dimensions(&self) -> &[DimensionTable] {
        &self.dimensions
    }

    pub fn facts(&self) -> &FactTable {
        &self.facts
    }

    /// Write each dimension, then the facts
    ///
    /// Every table is its own transaction. A failure leaves tables written
    /// earlier in the run committed; rerunning converges since writes merge.
    pub async fn load<T>(self, target: &T) -> StageResult<RunResult>
    where
        T: UpsertTarget + ?Sized,
    {
        let fail = |e: EtlError| PipelineError::new(Stage::Load, e);
        let mut dimensions_loaded = BTreeMap::new();

        for dimension in &self.dimensions {
            let table = dimension_by_section(dimension.name())
                .map(|spec| spec.table)
                .ok_or_else(|| {
                    fail(EtlError::config(format!("No table for section '{}'", dimension.name())))
                })?;

            info!("[LOAD] Upserting {} rows into {}", dimension.len(), table);
            let count = target.upsert_dimension(table, dimension).await.map_err(fail)?;
            dimensions_loaded.insert(table.to_string(), count);
        }

        info!("[LOAD] Upserting {} rows into {}", self.facts.len(), FACT_TABLE);
        let facts_loaded = target.upsert_facts(FACT_TABLE, &self.facts).await.map_err(fail)?;

        let result = RunResult::new(dimensions_loaded, facts_loaded);
        info!(
            total_dimensions = result.total_dimensions(),
            facts = result.facts_loaded(),
            "[LOAD] Completed; tables were committed independently"
        );

        Ok(result)
    }
}
