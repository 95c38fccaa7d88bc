//! Data extraction
//!
//! Loads the file behind a [`Distribution`] into an [`ExtractedTable`].
//! The extractor only resolves the location and picks a reader for the
//! declared encoding; turning bytes into rows is the [`TableReader`]'s job.

mod reader;
pub mod table;

pub use reader::{CsvTableReader, Delimiter, TableReader};
pub use table::{CellValue, Column, ColumnType, ExtractedTable, format_float};

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::descriptor::Distribution;

/// Encoding assumed when a distribution does not declare one
pub const DEFAULT_ENCODING: &str = "text/csv";

/// Errors raised while extracting a distribution
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Distribution has no content location
    #[error("Distribution '{distribution}' has no content location")]
    MissingLocation { distribution: String },

    /// Declared encoding is not a delimited-text format
    #[error("Unsupported encoding format: {0}")]
    UnsupportedEncoding(String),

    /// Source file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source file is not well-formed delimited text
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Columns or rows of unequal length
    #[error("Malformed table: {0}")]
    Shape(String),
}

impl ExtractError {
    /// Whether retrying the same read could succeed
    pub fn is_io(&self) -> bool {
        matches!(self, ExtractError::Io { .. })
    }
}

/// Resolves distributions and reads them through a [`TableReader`]
pub struct DataExtractor {
    reader: Box<dyn TableReader>,
}

impl Default for DataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DataExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataExtractor").finish_non_exhaustive()
    }
}

impl DataExtractor {
    /// Create an extractor backed by the `csv` crate reader
    pub fn new() -> Self {
        Self::with_reader(CsvTableReader)
    }

    /// Create an extractor with a custom reader
    pub fn with_reader(reader: impl TableReader + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    /// Load a distribution into a table.
    ///
    /// Relative locations resolve against `base_path`, else the current
    /// working directory.
    pub fn extract_from_distribution(
        &self,
        distribution: &Distribution,
        base_path: Option<&Path>,
    ) -> Result<ExtractedTable, ExtractError> {
        let path = resolve_location(distribution, base_path)?;
        let encoding = distribution
            .encoding_format
            .as_deref()
            .unwrap_or(DEFAULT_ENCODING);
        let delimiter = Delimiter::for_encoding(encoding)?;

        debug!(
            distribution = ?distribution.id,
            path = %path.display(),
            encoding,
            "Extracting distribution"
        );

        self.reader.read(&path, delimiter)
    }
}

/// Resolve the on-disk path of a distribution
pub fn resolve_location(
    distribution: &Distribution,
    base_path: Option<&Path>,
) -> Result<PathBuf, ExtractError> {
    let location = distribution
        .content_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ExtractError::MissingLocation {
            distribution: distribution.id.clone().unwrap_or_default(),
        })?;
    let location = location.strip_prefix("file://").unwrap_or(location);
    let path = PathBuf::from(location);
    if path.is_absolute() {
        return Ok(path);
    }

    let base = match base_path {
        Some(base) => base.to_path_buf(),
        None => std::env::current_dir().map_err(|source| ExtractError::Io {
            path: path.clone(),
            source,
        })?,
    };
    Ok(base.join(path))
}
