//! Conversion run results

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ConversionError;
use crate::validation::ValidationResult;

/// Row and column counts plus written files for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub rows: usize,
    pub columns: usize,
    pub outputs: Vec<PathBuf>,
}

/// Aggregate outcome of one conversion run.
///
/// Keyed maps are ordered by table name. Record sets resolving to the same
/// table overwrite the earlier entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub run_id: Uuid,
    /// False if any table failed to convert
    pub success: bool,
    pub tables_converted: usize,
    pub tables: BTreeMap<String, TableStats>,
    pub validation_results: BTreeMap<String, ValidationResult>,
    /// Cross-table checks keyed `<TABLE>.<field> -> <REF_TABLE>`
    #[serde(default)]
    pub reference_results: BTreeMap<String, ValidationResult>,
    /// Per-table failure messages
    #[serde(default)]
    pub failures: BTreeMap<String, String>,
    /// Every accumulated message in processing order
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ConversionResult {
    pub(crate) fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            success: true,
            tables_converted: 0,
            tables: BTreeMap::new(),
            validation_results: BTreeMap::new(),
            reference_results: BTreeMap::new(),
            failures: BTreeMap::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub(crate) fn record_table(&mut self, table: &str, stats: TableStats) {
        self.tables_converted += 1;
        self.tables.insert(table.to_string(), stats);
    }

    /// Record a validation outcome; failures are listed in `errors` but do
    /// not clear `success`
    pub(crate) fn record_validation(&mut self, table: &str, result: ValidationResult) {
        if !result.valid {
            self.errors.push(format!(
                "Validation failed for {}: {}",
                table,
                result.errors.join("; ")
            ));
        }
        self.validation_results.insert(table.to_string(), result);
    }

    pub(crate) fn record_reference(&mut self, key: String, result: ValidationResult) {
        if !result.valid {
            self.errors.push(format!(
                "Reference check failed for {}: {}",
                key,
                result.errors.join("; ")
            ));
        }
        self.reference_results.insert(key, result);
    }

    pub(crate) fn record_failure(&mut self, table: &str, error: &ConversionError) {
        self.success = false;
        self.errors
            .push(format!("Error processing {}: {}", table, error));
        self.failures.insert(table.to_string(), error.to_string());
    }

    pub(crate) fn finish(mut self) -> Self {
        let elapsed = Utc::now() - self.started_at;
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
        self
    }

    /// Tables whose validation ran and failed
    pub fn invalid_tables(&self) -> Vec<&str> {
        self.validation_results
            .iter()
            .filter(|(_, r)| !r.valid)
            .map(|(t, _)| t.as_str())
            .collect()
    }

    /// Whether every table converted and every check that ran passed
    pub fn is_clean(&self) -> bool {
        self.success
            && self.validation_results.values().all(|r| r.valid)
            && self.reference_results.values().all(|r| r.valid)
    }
}
