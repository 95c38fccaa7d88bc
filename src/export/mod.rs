//! Export functionality
//!
//! Provides exporters for:
//! - Delimited text (one `.csv` file per table)
//! - SQL DDL (`CREATE TABLE`) with type inference
//! - SQL DML (batched multi-row `INSERT`)

pub mod csv;
pub mod sql;

use std::path::{Path, PathBuf};

/// Error during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Write text output, replacing any existing file
pub(crate) fn write_file(path: &Path, content: &str) -> Result<(), ExportError> {
    std::fs::write(path, content).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// Re-export for convenience
pub use self::csv::CsvExporter;
pub use sql::{ColumnSchema, SqlDialect, SqlExporter, TableSchema};
