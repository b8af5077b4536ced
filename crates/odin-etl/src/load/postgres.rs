//! PostgreSQL upsert target
//!
//! Each table is written inside its own transaction, in chunks of
//! multi-row `INSERT ... ON CONFLICT` statements. Dropping the transaction on
//! an error rolls the whole table back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::{
    last_wins, qualified_table, UpsertSpec, UpsertTarget, DEFAULT_CHUNK_SIZE, DIMENSION_UPSERT,
    FACT_UPSERT,
};
use crate::error::{EtlError, Result};
use crate::transform::{DimensionRecord, DimensionTable, FactRecord, FactTable};

/// Writes canonical tables into a PostgreSQL schema
#[derive(Debug, Clone)]
pub struct PgUpsertTarget {
    pool: PgPool,
    schema: Option<String>,
    chunk_size: usize,
}

impl PgUpsertTarget {
    /// Target tables are prefixed with `schema` unless it is `None` or empty
    pub fn new(pool: PgPool, schema: Option<String>) -> Self {
        Self {
            pool,
            schema: schema.filter(|s| !s.is_empty()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn table_name(&self, table: &str) -> String {
        qualified_table(self.schema.as_deref(), table)
    }

    fn total_chunks(&self, rows: usize) -> usize {
        rows.div_ceil(self.chunk_size)
    }
}

#[async_trait]
impl UpsertTarget for PgUpsertTarget {
    async fn upsert_dimension(&self, table: &str, rows: &DimensionTable) -> Result<u64> {
        let target = self.table_name(table);
        let records = last_wins(rows.records(), |r| r.key);
        let ingested_at = rows.ingested_at();
        let total_chunks = self.total_chunks(records.len());

        let mut tx = self.pool.begin().await.map_err(|e| EtlError::persistence(&target, e))?;

        for (chunk_idx, chunk) in records.chunks(self.chunk_size).enumerate() {
            debug!(
                "Upserting {} chunk {} / {} ({} rows)",
                target,
                chunk_idx + 1,
                total_chunks,
                chunk.len()
            );

            let mut query_builder = dimension_statement(&target, chunk, ingested_at);
            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| EtlError::persistence(&target, e))?;
        }

        tx.commit().await.map_err(|e| EtlError::persistence(&target, e))?;

        info!(table = %target, rows = records.len(), "Upserted dimension");
        Ok(records.len() as u64)
    }

    async fn upsert_facts(&self, table: &str, rows: &FactTable) -> Result<u64> {
        let target = self.table_name(table);
        let records = last_wins(rows.rows(), |r| r.fact_id.clone());
        let ingested_at = rows.ingested_at();
        let total_chunks = self.total_chunks(records.len());

        let mut tx = self.pool.begin().await.map_err(|e| EtlError::persistence(&target, e))?;

        for (chunk_idx, chunk) in records.chunks(self.chunk_size).enumerate() {
            info!(
                "Upserting {} chunk {} / {} ({} rows)",
                target,
                chunk_idx + 1,
                total_chunks,
                chunk.len()
            );

            let mut query_builder = fact_statement(&target, chunk, ingested_at);
            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| EtlError::persistence(&target, e))?;
        }

        tx.commit().await.map_err(|e| EtlError::persistence(&target, e))?;

        info!(table = %target, rows = records.len(), "Upserted facts");
        Ok(records.len() as u64)
    }
}

/// Merge statement for a chunk of dimension rows
pub fn dimension_statement<'a>(
    table: &str,
    rows: &'a [DimensionRecord<'a>],
    ingested_at: DateTime<Utc>,
) -> QueryBuilder<'a, Postgres> {
    statement(&DIMENSION_UPSERT, table, |query_builder| {
        query_builder.push_values(rows, |mut b, row| {
            b.push_bind(row.key)
                .push_bind(row.title)
                .push_bind(row.description)
                .push_bind(ingested_at);
        });
    })
}

/// Merge statement for a chunk of fact rows
pub fn fact_statement<'a>(
    table: &str,
    rows: &'a [&'a FactRecord],
    ingested_at: DateTime<Utc>,
) -> QueryBuilder<'a, Postgres> {
    statement(&FACT_UPSERT, table, |query_builder| {
        query_builder.push_values(rows, |mut b, row| {
            b.push_bind(row.fact_id.as_str());
            for key in row.keys.as_array() {
                b.push_bind(key);
            }
            for metric in row.metrics.as_array() {
                b.push_bind(metric);
            }
            b.push_bind(ingested_at);
        });
    })
}

fn statement<'a>(
    spec: &UpsertSpec,
    table: &str,
    push_rows: impl FnOnce(&mut QueryBuilder<'a, Postgres>),
) -> QueryBuilder<'a, Postgres> {
    let mut query_builder = QueryBuilder::new(spec.insert_head(table));
    push_rows(&mut query_builder);
    query_builder.push(spec.conflict_tail());
    query_builder
}
