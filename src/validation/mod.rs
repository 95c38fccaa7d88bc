//! Validation functionality
//!
//! Provides validation logic for:
//! - Extracted tables (required fields, primary keys, foreign keys)
//! - Identifiers used in output file names and SQL text
//! - Descriptor documents against a JSON Schema

pub mod input;
pub mod schema;
pub mod tables;

pub use input::{IdentifierError, validate_column_name, validate_table_name};
pub use schema::validate_descriptor_schema;
pub use tables::{TableValidator, ValidationResult};
