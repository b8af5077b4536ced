//! Error types for the mobility ETL

use std::path::PathBuf;
use thiserror::Error;

use crate::table::TableError;
use crate::validate::ValidationError;

/// Result type alias for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Error types for extraction, transformation, validation and loading
#[derive(Debug, Error)]
pub enum EtlError {
    /// A source document does not exist
    #[error("Source file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Table parse error: {0}")]
    Table(#[from] TableError),

    /// The metadata document declares the same section twice
    #[error("Metadata section '{0}' is declared more than once")]
    DuplicateSection(String),

    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A table write failed; the table's transaction was rolled back
    #[error("Failed to persist table '{table}': {source}")]
    Persistence {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Map an I/O failure on `path`, distinguishing a missing file
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn persistence(table: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Persistence {
            table: table.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = EtlError::io(
            "/data/meta.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, EtlError::NotFound { .. }));
        assert_eq!(err.to_string(), "Source file not found: /data/meta.csv");
    }

    #[test]
    fn test_io_other_kind_keeps_source() {
        let err = EtlError::io(
            "/data/meta.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, EtlError::Io { .. }));
    }
}
