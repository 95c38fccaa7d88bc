//! Croissant to OMOP - convert Bio-Croissant dataset descriptors into OMOP CDM tables
//!
//! Provides:
//! - Descriptor parsing and ISO 11179 metadata inspection
//! - Record set to OMOP table mapping with primary/foreign key discovery
//! - Extraction of delimited-text distributions
//! - Validation of required fields, primary keys and foreign keys
//! - CSV, DDL and batched INSERT export
//! - A converter that runs the whole pipeline per record set

pub mod convert;
pub mod descriptor;
pub mod export;
pub mod extract;
pub mod mapping;
pub mod validation;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use convert::{
    ConversionError, ConversionOptions, ConversionResult, Converter, FatalError, OutputFormat,
    TableStats,
};
pub use descriptor::{
    Descriptor, DescriptorError, DescriptorReport, Distribution, Field, RecordCollection,
    ScalarType,
};
pub use export::{CsvExporter, ExportError, SqlDialect, SqlExporter, TableSchema};
pub use extract::{CellValue, DataExtractor, ExtractError, ExtractedTable};
pub use mapping::{FieldMapping, ForeignKeyRef, RequiredFieldRegistry, TableMapper, TableMapping};
pub use validation::{TableValidator, ValidationResult};
