//! Identifier checks for names that end up in file names and SQL text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for table names
pub const MAX_TABLE_NAME_LENGTH: usize = 255;

/// Maximum length for column names
pub const MAX_COLUMN_NAME_LENGTH: usize = 255;

/// Errors that can occur during identifier validation.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum IdentifierError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),
}

/// Validate a target table name.
///
/// Table names become output file names and unquoted SQL identifiers.
///
/// # Rules
///
/// - Must not be empty
/// - Must not exceed 255 characters
/// - Must start with a letter or underscore
/// - May contain letters, digits, and underscores
///
/// # Examples
///
/// ```
/// use croissant_omop::validation::input::validate_table_name;
///
/// assert!(validate_table_name("PERSON").is_ok());
/// assert!(validate_table_name("CONDITION_OCCURRENCE").is_ok());
/// assert!(validate_table_name("").is_err());
/// assert!(validate_table_name("../person").is_err());
/// assert!(validate_table_name("drug-exposure").is_err());
/// ```
pub fn validate_table_name(name: &str) -> Result<(), IdentifierError> {
    validate_identifier("table name", name, MAX_TABLE_NAME_LENGTH)
}

/// Validate a column name that will appear in DDL or INSERT text.
///
/// Same rules as [`validate_table_name`].
///
/// # Examples
///
/// ```
/// use croissant_omop::validation::input::validate_column_name;
///
/// assert!(validate_column_name("person_id").is_ok());
/// assert!(validate_column_name("birth date").is_err());
/// assert!(validate_column_name("id INTEGER); DROP TABLE PERSON; --").is_err());
/// ```
pub fn validate_column_name(name: &str) -> Result<(), IdentifierError> {
    validate_identifier("column name", name, MAX_COLUMN_NAME_LENGTH)
}

fn validate_identifier(field: &'static str, name: &str, max: usize) -> Result<(), IdentifierError> {
    if name.len() > max {
        return Err(IdentifierError::TooLong {
            field,
            max,
            actual: name.len(),
        });
    }

    let first_char = match name.chars().next() {
        Some(c) => c,
        None => return Err(IdentifierError::Empty(field)),
    };
    if !first_char.is_alphabetic() && first_char != '_' {
        return Err(IdentifierError::InvalidFormat(
            field,
            "must start with a letter or underscore".to_string(),
        ));
    }

    if let Some(c) = name.chars().find(|c| !c.is_alphanumeric() && *c != '_') {
        return Err(IdentifierError::InvalidCharacters {
            field,
            reason: format!("invalid character: '{}'", c),
        });
    }

    Ok(())
}
