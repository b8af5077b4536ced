//! Structural and referential checks on canonical tables
//!
//! Validation never repairs data. Checks run table by table and stop at the
//! first table that fails: every dimension first, then the fact table, whose
//! foreign keys are looked up in the dimension key sets.

use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use odin_common::checksum::is_md5_hex;

use crate::schema::{dimension_columns, DIMENSIONS, FACT_ID, FACT_TABLE};
use crate::transform::{DimensionTable, FactTable};

/// Maximum number of offending values kept in a [`ValidationError`]
pub const MAX_SAMPLE: usize = 5;

/// The rule a table violated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// A required column does not exist
    ColumnPresent,
    NotNull,
    Unique,
    /// Values must appear among the keys of the named dimension
    ForeignKey { dimension: String },
    /// The dimension a fact column refers to was not provided
    DimensionAvailable,
    /// `fact_id` must be a 32 character lowercase hex digest
    IdentityFormat,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::ColumnPresent => write!(f, "column present"),
            Rule::NotNull => write!(f, "not null"),
            Rule::Unique => write!(f, "unique"),
            Rule::ForeignKey { dimension } => write!(f, "references {}.key", dimension),
            Rule::DimensionAvailable => write!(f, "dimension available"),
            Rule::IdentityFormat => write!(f, "md5 hex identity"),
        }
    }
}

/// A violated rule with the offending rows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{table}.{column}: rule '{rule}' violated by {} row(s), sample {:?}", .rows.len(), .values)]
pub struct ValidationError {
    pub table: String,
    pub column: String,
    pub rule: Rule,
    /// Zero-based indices of offending rows
    pub rows: Vec<usize>,
    /// Up to [`MAX_SAMPLE`] distinct offending values
    pub values: Vec<String>,
}

impl ValidationError {
    fn new(table: &str, column: &str, rule: Rule) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            rule,
            rows: Vec::new(),
            values: Vec::new(),
        }
    }

    fn record(&mut self, row: usize, value: Option<&str>) {
        self.rows.push(row);
        if let Some(value) = value {
            if self.values.len() < MAX_SAMPLE && !self.values.iter().any(|v| v == value) {
                self.values.push(value.to_string());
            }
        }
    }

    fn into_result(self) -> Result<(), ValidationError> {
        if self.rows.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Check one dimension: `key` present, non-null and unique; `title` present and non-null
pub fn validate_dimension(table: &DimensionTable) -> Result<(), ValidationError> {
    let name = table.name();

    for column in [dimension_columns::KEY, dimension_columns::TITLE] {
        if !table.has_column(column) {
            return Err(ValidationError::new(name, column, Rule::ColumnPresent));
        }
    }

    let mut missing_keys = ValidationError::new(name, dimension_columns::KEY, Rule::NotNull);
    let mut duplicates = ValidationError::new(name, dimension_columns::KEY, Rule::Unique);
    let mut missing_titles = ValidationError::new(name, dimension_columns::TITLE, Rule::NotNull);
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (row, record) in table.records().enumerate() {
        match record.key {
            None => missing_keys.record(row, None),
            Some(key) => {
                if first_seen.insert(key, row).is_some() {
                    duplicates.record(row, Some(key));
                }
            },
        }
        if record.title.is_none() {
            missing_titles.record(row, record.key);
        }
    }

    missing_keys.into_result()?;
    duplicates.into_result()?;
    missing_titles.into_result()?;

    debug!(table = name, rows = table.len(), "Dimension passed validation");
    Ok(())
}

/// Check the fact table against the dimensions it references
///
/// `dimensions` are looked up by section name and are expected to have
/// passed [`validate_dimension`] already.
pub fn validate_facts(
    facts: &FactTable,
    dimensions: &[DimensionTable],
) -> Result<(), ValidationError> {
    let mut key_sets: Vec<HashSet<&str>> = Vec::with_capacity(DIMENSIONS.len());
    for spec in &DIMENSIONS {
        let dimension = dimensions
            .iter()
            .find(|d| d.name() == spec.section)
            .ok_or_else(|| {
                ValidationError::new(FACT_TABLE, spec.fact_column, Rule::DimensionAvailable)
            })?;
        let keys = dimension
            .values(dimension_columns::KEY)
            .map(|values| values.flatten().collect())
            .unwrap_or_default();
        key_sets.push(keys);
    }

    let mut bad_ids = ValidationError::new(FACT_TABLE, FACT_ID, Rule::IdentityFormat);
    for (row, record) in facts.rows().iter().enumerate() {
        if !is_md5_hex(&record.fact_id) {
            bad_ids.record(row, Some(&record.fact_id));
        }
    }
    bad_ids.into_result()?;

    for (position, (spec, keys)) in DIMENSIONS.iter().zip(&key_sets).enumerate() {
        let mut orphans = ValidationError::new(
            FACT_TABLE,
            spec.fact_column,
            Rule::ForeignKey {
                dimension: spec.table.to_string(),
            },
        );
        for (row, record) in facts.rows().iter().enumerate() {
            let value = record.keys.as_array()[position];
            if !keys.contains(value) {
                orphans.record(row, Some(value));
            }
        }
        orphans.into_result()?;
    }

    debug!(rows = facts.len(), "Fact table passed validation");
    Ok(())
}

/// Validate every dimension, then the facts; stops at the first failing table
pub fn validate_all(
    dimensions: &[DimensionTable],
    facts: &FactTable,
) -> Result<(), ValidationError> {
    for dimension in dimensions {
        validate_dimension(dimension)?;
    }
    validate_facts(facts, dimensions)
}
