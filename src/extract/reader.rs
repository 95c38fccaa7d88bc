//! Delimited-text readers

use std::path::Path;

use super::{ExtractError, ExtractedTable};

/// Field delimiter of a supported encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// Pick the delimiter for a declared encoding.
    ///
    /// Matching is a case-insensitive substring test. Only delimited text
    /// is supported.
    pub fn for_encoding(encoding: &str) -> Result<Self, ExtractError> {
        let lower = encoding.to_ascii_lowercase();
        if lower.contains("tab-separated-values") || lower.contains("tsv") {
            Ok(Delimiter::Tab)
        } else if lower.contains("csv") {
            Ok(Delimiter::Comma)
        } else {
            Err(ExtractError::UnsupportedEncoding(encoding.to_string()))
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Turns a file into a columnar table
pub trait TableReader: Send + Sync {
    fn read(&self, path: &Path, delimiter: Delimiter) -> Result<ExtractedTable, ExtractError>;
}

/// Reader for delimited text with a header row
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableReader;

impl TableReader for CsvTableReader {
    fn read(&self, path: &Path, delimiter: Delimiter) -> Result<ExtractedTable, ExtractError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(true)
            .flexible(false)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| csv_error(path, e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        ExtractedTable::from_raw_rows(&headers, &rows)
    }
}

fn csv_error(path: &Path, err: csv::Error) -> ExtractError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => ExtractError::Io {
            path: path.to_path_buf(),
            source,
        },
        _ => ExtractError::Parse {
            path: path.to_path_buf(),
            message,
        },
    }
}
