//! Idempotent persistence of canonical tables
//!
//! Every table is written with one merge statement shape:
//! `INSERT ... ON CONFLICT (<key>) DO UPDATE SET <col> = EXCLUDED.<col>`.
//! Dimensions merge on `key` and overwrite `title`, `description` and
//! `ingested_at`. Facts merge on `fact_id` and overwrite only the metrics and
//! `ingested_at`; their foreign keys are written once.

pub mod postgres;

use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Result;
use crate::schema::{dimension_columns, FACT_ID, INGESTED_AT, METRICS};
use crate::transform::{DimensionTable, FactTable};

pub use postgres::PgUpsertTarget;

/// Rows written per statement
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A store that accepts merged writes of canonical tables
///
/// Each call is atomic for its table: all rows are written or none are.
/// The returned count is the number of distinct rows written.
#[async_trait]
pub trait UpsertTarget: Send + Sync {
    async fn upsert_dimension(&self, table: &str, rows: &DimensionTable) -> Result<u64>;

    async fn upsert_facts(&self, table: &str, rows: &FactTable) -> Result<u64>;
}

/// Column layout of one merge statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertSpec {
    /// Inserted columns, in bind order
    pub columns: &'static [&'static str],
    /// Conflict key
    pub conflict: &'static str,
    /// Columns overwritten when the key already exists
    pub updates: &'static [&'static str],
}

pub const DIMENSION_UPSERT: UpsertSpec = UpsertSpec {
    columns: &[
        dimension_columns::KEY,
        dimension_columns::TITLE,
        dimension_columns::DESCRIPTION,
        dimension_columns::INGESTED_AT,
    ],
    conflict: dimension_columns::KEY,
    updates: &[
        dimension_columns::TITLE,
        dimension_columns::DESCRIPTION,
        dimension_columns::INGESTED_AT,
    ],
};

pub const FACT_UPSERT: UpsertSpec = UpsertSpec {
    columns: &FactTable::COLUMNS,
    conflict: FACT_ID,
    updates: &[
        METRICS[0].1,
        METRICS[1].1,
        METRICS[2].1,
        METRICS[3].1,
        METRICS[4].1,
        METRICS[5].1,
        INGESTED_AT,
    ],
};

impl UpsertSpec {
    /// `INSERT INTO <table> (<columns>) `
    pub fn insert_head(&self, table: &str) -> String {
        format!("INSERT INTO {} ({}) ", table, self.columns.join(", "))
    }

    /// ` ON CONFLICT (<key>) DO UPDATE SET <col> = EXCLUDED.<col>, ...`
    pub fn conflict_tail(&self) -> String {
        let assignments = self
            .updates
            .iter()
            .map(|column| format!("{0} = EXCLUDED.{0}", column))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" ON CONFLICT ({}) DO UPDATE SET {}", self.conflict, assignments)
    }
}

/// Table name with the optional schema prefix
pub fn qualified_table(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => format!("{}.{}", schema, table),
        _ => table.to_string(),
    }
}

/// Collapse rows sharing a key, keeping the last one at the first one's position
///
/// One statement cannot touch the same conflict key twice, and a rerun of the
/// same input must converge on the last value.
pub fn last_wins<T, K, F>(rows: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut kept: Vec<T> = Vec::new();

    for row in rows {
        match positions.get(&key(&row)) {
            Some(&position) => kept[position] = row,
            None => {
                positions.insert(key(&row), kept.len());
                kept.push(row);
            },
        }
    }

    kept
}
