//! Common test utilities for odin-etl integration tests
//!
//! - [`MemoryTarget`]: an in-memory [`UpsertTarget`] with the same merge semantics
//!   as the PostgreSQL target, for orchestrator tests without a database
//! - [`TestPostgres`]: a PostgreSQL container with the star schema created
//! - Fixture helpers that lay out source files in a temporary data directory

#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use odin_etl::config::SourceConfig;
use odin_etl::transform::{DimensionTable, FactKeys, FactMetrics, FactTable};
use odin_etl::{EtlError, UpsertTarget};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

pub const METADATA_FIXTURE: &str = include_str!("../fixtures/metadata.csv");
pub const DATA_FIXTURE: &str = include_str!("../fixtures/data.csv");
pub const SCHEMA_FIXTURE: &str = include_str!("../fixtures/schema.sql");

/// Schema the star-schema fixture creates its tables in
pub const TEST_SCHEMA: &str = "odin";

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,odin_etl=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Source fixtures
// ============================================================================

/// Temporary data directory holding a metadata and a data file
pub struct SourceFixture {
    pub dir: TempDir,
    pub config: SourceConfig,
}

impl SourceFixture {
    /// The bundled survey sample
    pub fn sample() -> Result<Self> {
        Self::with_contents(METADATA_FIXTURE, DATA_FIXTURE)
    }

    pub fn with_contents(metadata: &str, data: &str) -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp dir")?;
        std::fs::write(dir.path().join("metadata.csv"), metadata)?;
        std::fs::write(dir.path().join("data.csv"), data)?;

        let config = source_config(dir.path());
        Ok(Self { dir, config })
    }
}

pub fn source_config(data_dir: &Path) -> SourceConfig {
    SourceConfig {
        data_dir: data_dir.to_path_buf(),
        metadata_file: "metadata.csv".to_string(),
        data_file: "data.csv".to_string(),
        separator: b';',
    }
}

// ============================================================================
// In-memory upsert target
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDimension {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFact {
    pub keys: FactKeys,
    pub metrics: FactMetrics,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Store {
    dimensions: HashMap<String, BTreeMap<String, StoredDimension>>,
    facts: HashMap<String, BTreeMap<String, StoredFact>>,
    calls: Vec<String>,
}

/// Keeps tables in memory; conflicting rows are merged like `ON CONFLICT DO UPDATE`
#[derive(Debug, Default)]
pub struct MemoryTarget {
    store: Mutex<Store>,
    fail_on: Option<String>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write to `table` fails without changing anything
    pub fn failing_on(table: &str) -> Self {
        Self {
            store: Mutex::default(),
            fail_on: Some(table.to_string()),
        }
    }

    pub fn dimension(&self, table: &str) -> BTreeMap<String, StoredDimension> {
        let store = self.store.lock().unwrap();
        store.dimensions.get(table).cloned().unwrap_or_default()
    }

    pub fn facts(&self, table: &str) -> BTreeMap<String, StoredFact> {
        let store = self.store.lock().unwrap();
        store.facts.get(table).cloned().unwrap_or_default()
    }

    /// Tables written so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.store.lock().unwrap().calls.clone()
    }

    fn check_failure(&self, table: &str) -> odin_etl::Result<()> {
        if self.fail_on.as_deref() == Some(table) {
            return Err(EtlError::persistence(
                table,
                sqlx::Error::Protocol("simulated write failure".to_string()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UpsertTarget for MemoryTarget {
    async fn upsert_dimension(&self, table: &str, rows: &DimensionTable) -> odin_etl::Result<u64> {
        self.check_failure(table)?;

        let mut staged = BTreeMap::new();
        for record in rows.records() {
            let key = record.key.unwrap_or_default().to_string();
            staged.insert(
                key,
                StoredDimension {
                    title: record.title.map(str::to_string),
                    description: record.description.map(str::to_string),
                    ingested_at: rows.ingested_at(),
                },
            );
        }

        let written = staged.len() as u64;
        let mut store = self.store.lock().unwrap();
        store.calls.push(table.to_string());
        store.dimensions.entry(table.to_string()).or_default().extend(staged);
        Ok(written)
    }

    async fn upsert_facts(&self, table: &str, rows: &FactTable) -> odin_etl::Result<u64> {
        self.check_failure(table)?;

        let mut staged: BTreeMap<String, StoredFact> = BTreeMap::new();
        for record in rows.rows() {
            staged.insert(
                record.fact_id.clone(),
                StoredFact {
                    keys: record.keys.clone(),
                    metrics: record.metrics,
                    ingested_at: rows.ingested_at(),
                },
            );
        }

        let written = staged.len() as u64;
        let mut store = self.store.lock().unwrap();
        store.calls.push(table.to_string());
        let existing = store.facts.entry(table.to_string()).or_default();
        for (fact_id, row) in staged {
            match existing.get_mut(&fact_id) {
                // Foreign keys are write-once
                Some(current) => {
                    current.metrics = row.metrics;
                    current.ingested_at = row.ingested_at;
                },
                None => {
                    existing.insert(fact_id, row);
                },
            }
        }
        Ok(written)
    }
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// PostgreSQL container with the star schema created in [`TEST_SCHEMA`]
pub struct TestPostgres {
    container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
        debug!("PostgreSQL connection: {}", connection_string);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sqlx::raw_sql(SCHEMA_FIXTURE)
            .execute(&pool)
            .await
            .context("Failed to create star schema")?;

        Ok(Self { container, pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}.{}", TEST_SCHEMA, table);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}
