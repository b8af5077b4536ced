//! Single-table reader for the raw fact file

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};
use crate::table::RawTable;

/// A delimited file holding one table
#[derive(Debug, Clone)]
pub struct DataSource {
    path: PathBuf,
    separator: u8,
}

impl DataSource {
    pub fn new(path: impl Into<PathBuf>, separator: u8) -> Self {
        Self {
            path: path.into(),
            separator,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file; each call returns a fresh table
    pub fn read(&self) -> Result<RawTable> {
        let file = File::open(&self.path).map_err(|e| EtlError::io(&self.path, e))?;
        let table = RawTable::from_delimited(BufReader::new(file), self.separator)?;
        Ok(table)
    }
}
