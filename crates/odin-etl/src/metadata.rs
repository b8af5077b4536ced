//! Sectioned metadata document parser
//!
//! The survey ships its dimension tables in a single text document. Each
//! dimension is introduced by a line holding only its quoted name, followed by
//! a delimited header row and data rows:
//!
//! ```text
//! "Periods"
//! Key;Title;Description
//! 2023JJ00;2023;Year 2023
//!
//! "Margins"
//! Key;Title;Description
//! MW00000;Value;
//! ```
//!
//! Sections are parsed independently. A malformed section is reported and
//! dropped; the remaining sections are still returned.

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{EtlError, Result};
use crate::table::{RawTable, TableError};

const BOM: char = '\u{feff}';

/// A section that could not be parsed
#[derive(Debug)]
pub struct SectionFailure {
    pub section: String,
    pub error: TableError,
}

/// Result of parsing one metadata document
#[derive(Debug, Default)]
pub struct ParsedMetadata {
    sections: Vec<(String, RawTable)>,
    failures: Vec<SectionFailure>,
}

impl ParsedMetadata {
    /// Parsed sections in document order
    pub fn sections(&self) -> &[(String, RawTable)] {
        &self.sections
    }

    pub fn get(&self, name: &str) -> Option<&RawTable> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, table)| table)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    /// Sections dropped because their body did not parse
    pub fn failures(&self) -> &[SectionFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn into_sections(self) -> Vec<(String, RawTable)> {
        self.sections
    }
}

/// Splits a metadata document into named tables
#[derive(Debug, Clone, Copy)]
pub struct MetadataParser {
    separator: u8,
}

impl MetadataParser {
    pub fn new(separator: u8) -> Self {
        Self { separator }
    }

    /// Read and parse a metadata document from disk
    pub fn parse_file(&self, path: &Path) -> Result<ParsedMetadata> {
        let text = std::fs::read_to_string(path).map_err(|e| EtlError::io(path, e))?;
        self.parse_str(&text)
    }

    /// Parse a metadata document
    ///
    /// Fails only when a section name is declared twice. Sections whose body
    /// cannot be read as a delimited table are logged and left out.
    pub fn parse_str(&self, text: &str) -> Result<ParsedMetadata> {
        let headers = find_headers(text);
        debug!(count = headers.len(), "Found metadata section headers");

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.name) {
                return Err(EtlError::DuplicateSection(header.name.to_string()));
            }
        }

        let mut parsed = ParsedMetadata::default();

        for (i, header) in headers.iter().enumerate() {
            let body_end = headers.get(i + 1).map_or(text.len(), |next| next.line_start);
            let body = &text[header.body_start..body_end];

            match RawTable::from_delimited(body.as_bytes(), self.separator) {
                Ok(table) => {
                    debug!(
                        section = header.name,
                        rows = table.len(),
                        columns = table.columns().len(),
                        "Parsed metadata section"
                    );
                    parsed.sections.push((header.name.to_string(), table));
                },
                Err(error) => {
                    warn!(
                        section = header.name,
                        error = %error,
                        "Skipping malformed metadata section"
                    );
                    parsed.failures.push(SectionFailure {
                        section: header.name.to_string(),
                        error,
                    });
                },
            }
        }

        Ok(parsed)
    }
}

impl Default for MetadataParser {
    fn default() -> Self {
        Self::new(crate::schema::DEFAULT_SEPARATOR)
    }
}

struct SectionHeader<'a> {
    name: &'a str,
    /// Byte offset where the header line begins
    line_start: usize,
    /// Byte offset just past the header line's terminator
    body_start: usize,
}

fn find_headers(text: &str) -> Vec<SectionHeader<'_>> {
    let mut headers = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if let Some(name) = section_name(line) {
            headers.push(SectionHeader {
                name,
                line_start: offset,
                body_start: offset + line.len(),
            });
        }
        offset += line.len();
    }

    headers
}

/// Name of the section a line introduces, if it is a header line
fn section_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix(BOM).unwrap_or(trimmed);
    let name = trimmed.strip_prefix('"')?.strip_suffix('"')?;

    if name.is_empty() || name.contains('"') {
        return None;
    }
    Some(name)
}
