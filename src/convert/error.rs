//! Error types for conversion runs
//!
//! [`FatalError`] aborts a run before any table is processed.
//! [`ConversionError`] is scoped to one record collection: it is recorded
//! in the run result and the run moves on to the next table.

use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::DescriptorError;
use crate::export::ExportError;
use crate::extract::ExtractError;
use crate::validation::IdentifierError;

/// Conditions that abort a whole run
#[derive(Error, Debug)]
pub enum FatalError {
    /// Descriptor unreadable or malformed
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Run options rejected
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output directory could not be created
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure converting a single record collection
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Neither a declared target table nor a name
    #[error("Record set {record_set} has no resolvable table name")]
    MissingTableIdentity { record_set: String },

    /// Record collection declares no fields
    #[error("RecordSet {table} has no fields")]
    NoFields { table: String },

    /// First field does not point at a distribution
    #[error("No distribution reference found for {table}")]
    MissingDistributionReference { table: String },

    /// Referenced distribution is not declared
    #[error("Distribution {distribution} not found")]
    DistributionNotFound { table: String, distribution: String },

    /// Distribution has no content location
    #[error("Distribution missing contentUrl: {distribution}")]
    MissingLocation { table: String, distribution: String },

    /// Declared encoding is not delimited text
    #[error("Unsupported encoding format: {encoding}")]
    UnsupportedEncoding { table: String, encoding: String },

    /// Table name unusable in file names or SQL
    #[error("Invalid table name '{table}': {source}")]
    InvalidIdentifier {
        table: String,
        #[source]
        source: IdentifierError,
    },

    /// Column name unusable in SQL text
    #[error("Invalid column name '{column}' in {table}: {source}")]
    InvalidColumnName {
        table: String,
        column: String,
        #[source]
        source: IdentifierError,
    },

    /// Field declared without a usable name
    #[error("Field {position} of {table} has no name")]
    UnnamedField { table: String, position: usize },

    /// Source file could not be read or parsed
    #[error("{source}")]
    Read {
        table: String,
        #[source]
        source: ExtractError,
    },

    /// Output file could not be written
    #[error("{source}")]
    Write {
        table: String,
        #[source]
        source: ExportError,
    },
}

impl ConversionError {
    /// Lift an extraction failure into the per-table union
    pub fn from_extract(table: &str, err: ExtractError) -> Self {
        let table = table.to_string();
        match err {
            ExtractError::MissingLocation { distribution } => {
                ConversionError::MissingLocation { table, distribution }
            }
            ExtractError::UnsupportedEncoding(encoding) => {
                ConversionError::UnsupportedEncoding { table, encoding }
            }
            source => ConversionError::Read { table, source },
        }
    }

    /// Whether the same run could succeed on retry without changing the
    /// descriptor (I/O failures only)
    pub fn is_recoverable(&self) -> bool {
        match self {
            ConversionError::Read { source, .. } => source.is_io(),
            ConversionError::Write { .. } => true,
            _ => false,
        }
    }

    /// Table or record set the error is attributed to
    pub fn table_name(&self) -> &str {
        match self {
            ConversionError::MissingTableIdentity { record_set } => record_set,
            ConversionError::NoFields { table }
            | ConversionError::MissingDistributionReference { table }
            | ConversionError::DistributionNotFound { table, .. }
            | ConversionError::MissingLocation { table, .. }
            | ConversionError::UnsupportedEncoding { table, .. }
            | ConversionError::InvalidIdentifier { table, .. }
            | ConversionError::InvalidColumnName { table, .. }
            | ConversionError::UnnamedField { table, .. }
            | ConversionError::Read { table, .. }
            | ConversionError::Write { table, .. } => table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_errors_keep_their_kind() {
        let err = ConversionError::from_extract(
            "PERSON",
            ExtractError::UnsupportedEncoding("application/json".into()),
        );
        assert!(matches!(err, ConversionError::UnsupportedEncoding { .. }));
        assert_eq!(err.table_name(), "PERSON");
        assert_eq!(err.to_string(), "Unsupported encoding format: application/json");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_io_failures_are_recoverable() {
        let err = ConversionError::from_extract(
            "PERSON",
            ExtractError::Io {
                path: PathBuf::from("person.csv"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            },
        );
        assert!(err.is_recoverable());

        let err = ConversionError::NoFields {
            table: "PERSON".into(),
        };
        assert!(!err.is_recoverable());
    }
}
