//! Structural checks of extracted tables against the target model
//!
//! - required fields present (one violation listing every missing name)
//! - primary key `<lowercased table>_id` present, non-null and unique
//! - foreign key values present in a referenced column
//!
//! Tables unknown to the required-field registry are valid by default.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::{Column, ExtractedTable};
use crate::mapping::RequiredFieldRegistry;

/// Outcome of validating one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Violations in the order the checks ran
    pub errors: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: vec![error.into()],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
    }
}

/// Validates extracted tables against a required-field registry
#[derive(Debug, Clone)]
pub struct TableValidator {
    registry: RequiredFieldRegistry,
}

impl Default for TableValidator {
    fn default() -> Self {
        Self::new(RequiredFieldRegistry::omop())
    }
}

impl TableValidator {
    pub fn new(registry: RequiredFieldRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RequiredFieldRegistry {
        &self.registry
    }

    /// Run every per-table check that applies to `table_name`.
    ///
    /// Foreign keys are not checked here; see
    /// [`validate_foreign_keys`](Self::validate_foreign_keys).
    pub fn validate_table(&self, table_name: &str, table: &ExtractedTable) -> ValidationResult {
        if !self.registry.contains(table_name) {
            debug!(table = table_name, "Table not in registry, valid by default");
            return ValidationResult::valid();
        }

        let mut result = self.validate_required_fields(table_name, table);
        let pk_column = format!("{}_id", table_name.to_lowercase());
        result.merge(self.validate_primary_key(table, &pk_column));

        debug!(
            table = table_name,
            valid = result.valid,
            violations = result.errors.len(),
            "Validated table"
        );
        result
    }

    /// Check that every mandatory field of the table is a column.
    ///
    /// Missing fields are reported together in a single violation.
    pub fn validate_required_fields(
        &self,
        table_name: &str,
        table: &ExtractedTable,
    ) -> ValidationResult {
        let Some(required) = self.registry.required_fields(table_name) else {
            return ValidationResult::valid();
        };

        let missing: Vec<&str> = required
            .iter()
            .map(String::as_str)
            .filter(|field| !table.has_column(field))
            .collect();

        if missing.is_empty() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))
        }
    }

    /// Check that a key column exists, has no nulls, and has no duplicates.
    ///
    /// The duplicate count is the number of rows repeating an earlier
    /// value, not the number of distinct repeated values. Repeated nulls
    /// count as duplicates too.
    pub fn validate_primary_key(&self, table: &ExtractedTable, pk_column: &str) -> ValidationResult {
        let Some(column) = table.column(pk_column) else {
            return ValidationResult::invalid(format!("Primary key field '{}' not found", pk_column));
        };

        let mut result = ValidationResult::valid();
        if column.null_count() > 0 {
            result.merge(ValidationResult::invalid(format!(
                "Primary key '{}' contains null values",
                pk_column
            )));
        }

        let duplicates = duplicate_count(column);
        if duplicates > 0 {
            result.merge(ValidationResult::invalid(format!(
                "Primary key '{}' contains {} duplicate values",
                pk_column, duplicates
            )));
        }
        result
    }

    /// Check that every non-null value of `fk_column` appears in
    /// `ref_column` of `ref_table`.
    ///
    /// Reports the number of distinct orphaned values.
    pub fn validate_foreign_keys(
        &self,
        table: &ExtractedTable,
        fk_column: &str,
        ref_table: &ExtractedTable,
        ref_column: &str,
    ) -> ValidationResult {
        let Some(referencing) = table.column(fk_column) else {
            return ValidationResult::invalid(format!("Foreign key field '{}' not found", fk_column));
        };
        let Some(referenced) = ref_table.column(ref_column) else {
            return ValidationResult::invalid(format!(
                "Referenced field '{}' not found in referenced table",
                ref_column
            ));
        };

        let known: HashSet<_> = referenced.values.iter().filter_map(|v| v.key()).collect();
        let orphans: HashSet<_> = referencing
            .values
            .iter()
            .filter_map(|v| v.key())
            .filter(|key| !known.contains(key))
            .collect();

        if orphans.is_empty() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(format!(
                "Foreign key '{}' has {} orphaned references",
                fk_column,
                orphans.len()
            ))
        }
    }
}

/// Rows minus distinct values, with null counted as one value
fn duplicate_count(column: &Column) -> usize {
    let mut seen = HashSet::new();
    column.values.iter().filter(|v| !seen.insert(v.key())).count()
}
