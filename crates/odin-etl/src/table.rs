//! Raw tabular datasets as read from delimited text
//!
//! A [`RawTable`] keeps the source vocabulary untouched: column names exactly as
//! declared in the header row and every cell as optional text. An empty field
//! is a null cell. Normalizers turn raw tables into canonical ones.

use std::collections::HashSet;
use std::io::Read;
use thiserror::Error;

/// Errors raised while reading delimited text
#[derive(Debug, Error)]
pub enum TableError {
    #[error("No header row found")]
    MissingHeader,

    #[error("Line {line}: expected {expected} fields, saw {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Row has {found} cells but the table has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    #[error("Malformed delimited text: {0}")]
    Csv(#[from] csv::Error),
}

/// Column names plus rows of nullable text cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Empty table with the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from literal rows
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Option<&str>>>,
    ) -> Result<Self, TableError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row.into_iter().map(|c| c.map(str::to_string)).collect())?;
        }
        Ok(table)
    }

    /// Append a row; it must have exactly one cell per column
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell text at `row`, `column`; `None` for null cells or out-of-range indices
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Parse delimited text whose first non-blank line is the header row
    ///
    /// Quoted fields may contain the separator; quotes are escaped by doubling.
    /// Rows with fewer fields than the header are padded with nulls, rows with
    /// more fields are an error. Blank lines are skipped. Empty header names
    /// become `unnamed_<position>` and repeated names get a `.<n>` suffix.
    pub fn from_delimited<R: Read>(reader: R, separator: u8) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(separator)
            .quote(b'"')
            .double_quote(true)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = csv_reader.records();

        let header = loop {
            match records.next() {
                Some(record) => {
                    let record = record?;
                    if !is_blank(&record) {
                        break record;
                    }
                },
                None => return Err(TableError::MissingHeader),
            }
        };

        let mut table = Self::new(header_names(&header));
        let width = table.columns.len();

        for record in records {
            let record = record?;
            if is_blank(&record) {
                continue;
            }

            if record.len() > width {
                return Err(TableError::RaggedRow {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    expected: width,
                    found: record.len(),
                });
            }

            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect();
            row.resize(width, None);
            table.rows.push(row);
        }

        Ok(table)
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty()) && record.len() <= 1
}

fn header_names(header: &csv::StringRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let base = if name.trim().is_empty() {
                format!("unnamed_{}", position)
            } else {
                name.to_string()
            };

            let mut candidate = base.clone();
            let mut suffix = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            candidate
        })
        .collect()
}
