//! End-to-end conversion of a descriptor into target tables
//!
//! For each record collection, in descriptor order:
//! 1. **Map**: resolve the target table and field mappings
//! 2. **Extract**: load the distribution referenced by the first field
//! 3. **Validate** (optional): required fields and primary key
//! 4. **Export**: `<TABLE>.csv` and/or `<TABLE>_ddl.sql` + `<TABLE>_data.sql`
//!
//! A failure in one table is recorded and the run moves on; only an
//! unreadable descriptor, bad options or an uncreatable output directory
//! abort the run.
//!
//! # Example
//!
//! ```rust,no_run
//! use croissant_omop::convert::{ConversionOptions, Converter, OutputFormat};
//!
//! let options = ConversionOptions::new().with_output_format(OutputFormat::Both);
//! let result = Converter::new()
//!     .convert("dataset/metadata.json".as_ref(), "omop_out".as_ref(), &options)
//!     .unwrap();
//! println!("{} tables converted", result.tables_converted);
//! ```

mod error;
mod options;
mod result;

pub use error::{ConversionError, FatalError};
pub use options::{ConversionOptions, OutputFormat};
pub use result::{ConversionResult, TableStats};

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, info_span, warn};

use crate::descriptor::{Descriptor, RecordCollection};
use crate::export::{CsvExporter, SqlExporter};
use crate::extract::{DataExtractor, ExtractedTable};
use crate::mapping::{RequiredFieldRegistry, TableMapper, TableMapping};
use crate::validation::{TableValidator, validate_column_name, validate_table_name};

/// Drives map, extract, validate and export for every record collection
#[derive(Debug)]
pub struct Converter {
    mapper: TableMapper,
    validator: TableValidator,
    extractor: DataExtractor,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    /// Create a converter for the OMOP CDM tables
    pub fn new() -> Self {
        Self::with_registry(RequiredFieldRegistry::omop())
    }

    /// Create a converter with a custom required-field registry
    pub fn with_registry(registry: RequiredFieldRegistry) -> Self {
        Self {
            mapper: TableMapper::with_registry(registry.clone()),
            validator: TableValidator::new(registry),
            extractor: DataExtractor::new(),
        }
    }

    /// Replace the data extractor
    pub fn with_extractor(mut self, extractor: DataExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn mapper(&self) -> &TableMapper {
        &self.mapper
    }

    pub fn validator(&self) -> &TableValidator {
        &self.validator
    }

    /// Load a descriptor file and convert it
    pub fn convert(
        &self,
        metadata_path: &Path,
        output_dir: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionResult, FatalError> {
        let descriptor = Descriptor::from_path(metadata_path)?;
        self.convert_descriptor(&descriptor, output_dir, options)
    }

    /// Convert an already parsed descriptor
    pub fn convert_descriptor(
        &self,
        descriptor: &Descriptor,
        output_dir: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionResult, FatalError> {
        options.validate().map_err(FatalError::Config)?;
        if options.create_output_dir {
            std::fs::create_dir_all(output_dir).map_err(|source| FatalError::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;
        }

        let mut result = ConversionResult::start();
        let _span = info_span!("conversion_run", run_id = %result.run_id).entered();
        info!(
            record_sets = descriptor.record_sets.len(),
            format = %options.output_format,
            validate = options.validate,
            output = %output_dir.display(),
            "Starting conversion"
        );

        let sql = SqlExporter::new(options.dialect).with_batch_size(options.batch_size);
        let mut retained: BTreeMap<String, (TableMapping, ExtractedTable)> = BTreeMap::new();

        for record_set in &descriptor.record_sets {
            let mapping = self.mapper.map_table(record_set);
            let label = mapping
                .table_name()
                .unwrap_or_else(|| record_set.display_name())
                .to_string();
            let _table_span = info_span!("convert_table", table = %label).entered();

            match self.convert_table(
                descriptor,
                record_set,
                &mapping,
                output_dir,
                options,
                &sql,
                &mut result,
            ) {
                Ok((stats, table)) => {
                    debug!(rows = stats.rows, columns = stats.columns, "Table converted");
                    result.record_table(&label, stats);
                    if options.check_references {
                        retained.insert(label, (mapping, table));
                    }
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        recoverable = err.is_recoverable(),
                        "Table conversion failed"
                    );
                    result.record_failure(&label, &err);
                }
            }
        }

        if options.check_references {
            self.check_references(&retained, &mut result);
        }

        let result = result.finish();
        info!(
            success = result.success,
            tables_converted = result.tables_converted,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "Conversion finished"
        );
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn convert_table(
        &self,
        descriptor: &Descriptor,
        record_set: &RecordCollection,
        mapping: &TableMapping,
        output_dir: &Path,
        options: &ConversionOptions,
        sql: &SqlExporter,
        result: &mut ConversionResult,
    ) -> Result<(TableStats, ExtractedTable), ConversionError> {
        let table_name = mapping
            .table_name()
            .ok_or_else(|| ConversionError::MissingTableIdentity {
                record_set: record_set.display_name().to_string(),
            })?;
        validate_table_name(table_name).map_err(|source| ConversionError::InvalidIdentifier {
            table: table_name.to_string(),
            source,
        })?;

        let mut table = self.extract(descriptor, record_set, table_name, options)?;
        let renamed = table.rename_columns(mapping);
        if renamed > 0 {
            debug!(renamed, "Renamed source columns to target fields");
        }

        if options.validate {
            let validation = self.validator.validate_table(table_name, &table);
            if !validation.valid {
                warn!(violations = ?validation.errors, "Validation failed");
            }
            result.record_validation(table_name, validation);
        }

        if options.output_format.writes_sql() {
            check_column_names(table_name, mapping, &table)?;
        }

        let write_error = |source| ConversionError::Write {
            table: table_name.to_string(),
            source,
        };
        let mut outputs = Vec::new();

        if options.output_format.writes_csv() {
            let path = output_dir.join(format!("{}.csv", table_name));
            CsvExporter.export(&table, &path).map_err(write_error)?;
            outputs.push(path);
        }

        if options.output_format.writes_sql() {
            let schema = SqlExporter::table_schema(mapping, &table);
            let ddl_path = output_dir.join(format!("{}_ddl.sql", table_name));
            sql.write_ddl(&ddl_path, &schema).map_err(write_error)?;
            outputs.push(ddl_path);

            let data_path = output_dir.join(format!("{}_data.sql", table_name));
            sql.write_inserts(&data_path, table_name, &table)
                .map_err(write_error)?;
            outputs.push(data_path);
        }

        let stats = TableStats {
            rows: table.row_count(),
            columns: table.column_count(),
            outputs,
        };
        Ok((stats, table))
    }

    /// Locate and read the distribution behind a record collection
    fn extract(
        &self,
        descriptor: &Descriptor,
        record_set: &RecordCollection,
        table_name: &str,
        options: &ConversionOptions,
    ) -> Result<ExtractedTable, ConversionError> {
        if record_set.fields.is_empty() {
            return Err(ConversionError::NoFields {
                table: table_name.to_string(),
            });
        }

        if let Some(index) = record_set.fields.iter().position(|f| f.source_name().is_none()) {
            return Err(ConversionError::UnnamedField {
                table: table_name.to_string(),
                position: index + 1,
            });
        }

        let distribution_id = record_set.distribution_ref().ok_or_else(|| {
            ConversionError::MissingDistributionReference {
                table: table_name.to_string(),
            }
        })?;

        let distribution = descriptor.distribution(distribution_id).ok_or_else(|| {
            ConversionError::DistributionNotFound {
                table: table_name.to_string(),
                distribution: distribution_id.to_string(),
            }
        })?;

        debug!(distribution = distribution_id, "Resolved distribution");

        self.extractor
            .extract_from_distribution(distribution, options.base_path.as_deref())
            .map_err(|e| ConversionError::from_extract(table_name, e))
    }

    /// Check every foreign key whose referenced table was converted in
    /// this run
    fn check_references(
        &self,
        retained: &BTreeMap<String, (TableMapping, ExtractedTable)>,
        result: &mut ConversionResult,
    ) {
        for (table_name, (mapping, table)) in retained {
            for fk in &mapping.foreign_keys {
                let Some((ref_mapping, ref_table)) = retained.get(&fk.references_table) else {
                    debug!(
                        table = %table_name,
                        field = %fk.field,
                        references = %fk.references_table,
                        "Referenced table not converted, skipping reference check"
                    );
                    continue;
                };

                let fk_column = target_column(mapping, &fk.field);
                let ref_column = if fk.references_field.is_empty() {
                    fk_column
                } else {
                    target_column(ref_mapping, &fk.references_field)
                };

                let check =
                    self.validator
                        .validate_foreign_keys(table, fk_column, ref_table, ref_column);
                let key = format!("{}.{} -> {}", table_name, fk_column, fk.references_table);
                if !check.valid {
                    warn!(check = %key, violations = ?check.errors, "Reference check failed");
                }
                result.record_reference(key, check);
            }
        }
    }
}

/// Every name that reaches DDL or INSERT text: mapped target fields and
/// the extracted columns
fn check_column_names(
    table_name: &str,
    mapping: &TableMapping,
    table: &ExtractedTable,
) -> Result<(), ConversionError> {
    let names = mapping
        .field_mappings
        .iter()
        .map(|m| m.target_field.as_str())
        .chain(table.column_names());
    for name in names {
        validate_column_name(name).map_err(|source| ConversionError::InvalidColumnName {
            table: table_name.to_string(),
            column: name.to_string(),
            source,
        })?;
    }
    Ok(())
}

/// Column name of a field after renaming to target names
fn target_column<'a>(mapping: &'a TableMapping, source_field: &'a str) -> &'a str {
    mapping
        .field(source_field)
        .map(|m| m.target_field.as_str())
        .unwrap_or(source_field)
}
