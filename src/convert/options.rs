//! Conversion run options

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::export::SqlDialect;
use crate::export::sql::DEFAULT_BATCH_SIZE;

/// Which output files to write per table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<TABLE>.csv`
    #[default]
    Csv,
    /// `<TABLE>_ddl.sql` and `<TABLE>_data.sql`
    Sql,
    /// Both of the above
    Both,
}

impl OutputFormat {
    pub fn writes_csv(self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }

    pub fn writes_sql(self) -> bool {
        matches!(self, OutputFormat::Sql | OutputFormat::Both)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Sql => write!(f, "sql"),
            OutputFormat::Both => write!(f, "both"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "sql" => Ok(OutputFormat::Sql),
            "both" => Ok(OutputFormat::Both),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Options for one conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub output_format: OutputFormat,
    /// Run per-table validation
    pub validate: bool,
    /// Accepted for SQL output; does not change the emitted text
    pub dialect: SqlDialect,
    /// Rows per INSERT statement
    pub batch_size: usize,
    /// Directory for relative distribution locations (default: current dir)
    pub base_path: Option<PathBuf>,
    /// Check foreign keys across the tables converted in the run
    pub check_references: bool,
    /// Create the output directory when missing
    pub create_output_dir: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            validate: true,
            dialect: SqlDialect::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            base_path: None,
            check_references: false,
            create_output_dir: true,
        }
    }
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the base directory for relative distribution locations
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn with_check_references(mut self, check: bool) -> Self {
        self.check_references = check;
        self
    }

    pub fn with_create_output_dir(mut self, create: bool) -> Self {
        self.create_output_dir = create;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be at least 1".to_string());
        }
        if let Some(base) = &self.base_path
            && !base.is_dir()
        {
            return Err(format!("Base path is not a directory: {}", base.display()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConversionOptions::default();
        assert_eq!(options.output_format, OutputFormat::Csv);
        assert!(options.validate);
        assert_eq!(options.batch_size, 100);
        assert!(!options.check_references);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let options = ConversionOptions::new().with_batch_size(0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("SQL".parse::<OutputFormat>().unwrap(), OutputFormat::Sql);
        assert_eq!("both".parse::<OutputFormat>().unwrap(), OutputFormat::Both);
        assert!("parquet".parse::<OutputFormat>().is_err());
        assert!(OutputFormat::Both.writes_csv() && OutputFormat::Both.writes_sql());
        assert!(!OutputFormat::Csv.writes_sql());
    }
}
