//! Configuration management
//!
//! Everything is read from environment variables. Binaries load a `.env` file
//! first; values already present in the process environment take precedence.

use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::path::PathBuf;

use crate::error::{EtlError, Result};
use crate::schema::DEFAULT_SEPARATOR;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default directory holding the source files.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default database host.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default database port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default maximum database connections in the pool.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Where the source files live and how they are delimited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub data_dir: PathBuf,
    pub metadata_file: String,
    pub data_file: String,
    pub separator: u8,
}

impl SourceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read `DATA_DIR`, `METADATA_FILE_NAME`, `DATA_FILE_NAME` and `CSV_SEPARATOR`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let separator = match lookup("CSV_SEPARATOR") {
            Some(value) => parse_separator(&value)?,
            None => DEFAULT_SEPARATOR,
        };

        Ok(Self {
            data_dir: lookup("DATA_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            metadata_file: required(&lookup, "METADATA_FILE_NAME")?,
            data_file: required(&lookup, "DATA_FILE_NAME")?,
            separator,
        })
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(&self.metadata_file)
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file)
    }
}

/// Connection parameters of the target database
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub database: String,
    /// Table prefix; `None` writes unqualified table names
    pub schema: Option<String>,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read `USERNAME`, `PASSWORD`, `DATABASE`, `SCHEMA`, `HOST`, `PORT`,
    /// `DB_MAX_CONNECTIONS` and `DB_CONNECT_TIMEOUT`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let schema = lookup("SCHEMA")
            .ok_or_else(|| missing("SCHEMA"))?
            .trim()
            .to_string();

        let config = Self {
            username: required(&lookup, "USERNAME")?,
            password: required(&lookup, "PASSWORD")?,
            database: required(&lookup, "DATABASE")?,
            schema: (!schema.is_empty()).then_some(schema),
            host: lookup("HOST")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
            port: numeric(&lookup, "PORT", DEFAULT_DB_PORT)?,
            max_connections: numeric(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            connect_timeout_secs: numeric(
                &lookup,
                "DB_CONNECT_TIMEOUT",
                DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(EtlError::config("PORT must be greater than 0"));
        }

        if self.max_connections == 0 {
            return Err(EtlError::config("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        if let Some(schema) = &self.schema {
            if !is_identifier(schema) {
                return Err(EtlError::config(format!(
                    "SCHEMA '{}' is not a valid identifier",
                    schema
                )));
            }
        }

        Ok(())
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Full configuration of a load run
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
}

impl EtlConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            source: SourceConfig::from_lookup(&lookup)?,
            database: DatabaseConfig::from_lookup(&lookup)?,
        })
    }
}

fn missing(name: &str) -> EtlError {
    EtlError::config(format!("Missing required env var: {}", name))
}

fn required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| missing(name))
}

/// Unset or blank falls back to `default`; anything else must parse
fn numeric<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value.trim().parse().map_err(|_| {
            EtlError::config(format!("{} must be a number, got '{}'", name, value))
        }),
        _ => Ok(default),
    }
}

fn parse_separator(value: &str) -> Result<u8> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(EtlError::config(format!(
            "CSV_SEPARATOR must be a single ASCII character, got '{}'",
            value
        ))),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
