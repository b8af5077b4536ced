//! Dimension normalizer
//!
//! Cleaning runs in a fixed order, each step seeing the previous one's output:
//!
//! 1. Rename `Key`/`Title`/`Description` (any case, or `desc`) to canonical names
//! 2. Trim `key`, `title` and `description`; `nan` and `None` tokens become null
//! 3. Empty and single-space cells become null in every column
//! 4. Stamp `ingested_at`

use chrono::{DateTime, Utc};

use crate::schema::{canonical_dimension_column, dimension_columns};
use crate::table::RawTable;

/// Canonical dimension table
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    ingested_at: DateTime<Utc>,
}

/// Borrowed view of one dimension row's canonical fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionRecord<'a> {
    pub key: Option<&'a str>,
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl DimensionTable {
    /// Section name this table was built from
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
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

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    /// Cells of one column, `None` if the column does not exist
    pub fn values<'a>(
        &'a self,
        column: &str,
    ) -> Option<impl Iterator<Item = Option<&'a str>> + 'a> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| row[index].as_deref()))
    }

    /// Canonical fields of every row; absent columns read as null
    pub fn records(&self) -> impl Iterator<Item = DimensionRecord<'_>> {
        let key = self.column_index(dimension_columns::KEY);
        let title = self.column_index(dimension_columns::TITLE);
        let description = self.column_index(dimension_columns::DESCRIPTION);

        self.rows.iter().map(move |row| {
            let cell = move |index: Option<usize>| index.and_then(|i| row[i].as_deref());
            DimensionRecord {
                key: cell(key),
                title: cell(title),
                description: cell(description),
            }
        })
    }
}

/// Normalize one raw dimension section
pub fn normalize_dimension(
    name: &str,
    raw: &RawTable,
    ingested_at: DateTime<Utc>,
) -> DimensionTable {
    let columns = rename_columns(raw.columns());

    let text_columns: Vec<bool> = columns
        .iter()
        .map(|c| {
            matches!(
                c.as_str(),
                dimension_columns::KEY | dimension_columns::TITLE | dimension_columns::DESCRIPTION
            )
        })
        .collect();

    let rows = raw
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&text_columns)
                .map(|(cell, &is_text)| {
                    let cell = cell.as_deref();
                    let cell = if is_text { clean_text(cell) } else { cell };
                    blank_to_null(cell).map(str::to_string)
                })
                .collect()
        })
        .collect();

    DimensionTable {
        name: name.to_string(),
        columns,
        rows,
        ingested_at,
    }
}

/// First source column mapping to a canonical name takes it; later ones keep their name
fn rename_columns(source: &[String]) -> Vec<String> {
    let mut taken: Vec<&str> = Vec::new();
    source
        .iter()
        .map(|name| match canonical_dimension_column(name) {
            Some(canonical) if !taken.contains(&canonical) => {
                taken.push(canonical);
                canonical.to_string()
            },
            _ => name.clone(),
        })
        .collect()
}

fn clean_text(cell: Option<&str>) -> Option<&str> {
    let value = cell?.trim();
    match value {
        "nan" | "None" => None,
        _ => Some(value),
    }
}

fn blank_to_null(cell: Option<&str>) -> Option<&str> {
    match cell? {
        "" | " " => None,
        value => Some(value),
    }
}
