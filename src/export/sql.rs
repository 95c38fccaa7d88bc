//! SQL exporter for CREATE TABLE and batched INSERT statements.
//!
//! Identifiers are emitted unquoted. Table names are checked by
//! [`validate_table_name`](crate::validation::validate_table_name) before
//! they reach this module; column names come straight from the descriptor.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ExportError, write_file};
use crate::descriptor::ScalarType;
use crate::extract::{CellValue, ColumnType, ExtractedTable, format_float};
use crate::mapping::TableMapping;

/// Default number of rows per INSERT statement
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Target SQL dialect.
///
/// Accepted for every SQL operation but does not change the emitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    PostgreSql,
    MySql,
    Sqlite,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::PostgreSql => write!(f, "postgresql"),
            SqlDialect::MySql => write!(f, "mysql"),
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(SqlDialect::PostgreSql),
            "mysql" => Ok(SqlDialect::MySql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            _ => Err(format!("Unknown SQL dialect: {}", s)),
        }
    }
}

/// Column definition for DDL generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub sql_type: String,
    /// Nullability override; `None` means nullable unless primary key
    pub nullable: Option<bool>,
    pub primary_key: bool,
}

impl ColumnSchema {
    pub fn is_not_null(&self) -> bool {
        self.primary_key || self.nullable == Some(false)
    }
}

/// Table definition for DDL generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Primary key columns in declaration order
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Exporter for SQL DDL and DML.
#[derive(Debug, Clone)]
pub struct SqlExporter {
    dialect: SqlDialect,
    batch_size: usize,
}

impl Default for SqlExporter {
    fn default() -> Self {
        Self::new(SqlDialect::default())
    }
}

impl SqlExporter {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the number of rows per INSERT statement (minimum 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// SQL type for a declared scalar type
    pub fn map_datatype(data_type: Option<ScalarType>) -> &'static str {
        match data_type {
            Some(ScalarType::Integer) => "INTEGER",
            Some(ScalarType::Float) => "FLOAT",
            Some(ScalarType::Text) => "VARCHAR(255)",
            Some(ScalarType::Date) => "DATE",
            Some(ScalarType::DateTime) => "TIMESTAMP",
            Some(ScalarType::Boolean) => "BOOLEAN",
            None => "VARCHAR(255)",
        }
    }

    /// SQL type observed in a column, if it decides one
    fn observed_datatype(column_type: ColumnType) -> Option<&'static str> {
        match column_type {
            ColumnType::Integer => Some("INTEGER"),
            ColumnType::Float => Some("FLOAT"),
            ColumnType::Boolean => Some("BOOLEAN"),
            ColumnType::Text | ColumnType::Empty => None,
        }
    }

    /// Build the DDL model for a mapping.
    ///
    /// Each mapped field becomes a column named after its target field. The
    /// observed type of a matching column in `table` wins over the declared
    /// type; text and all-null columns fall back to the declared type.
    pub fn table_schema(mapping: &TableMapping, table: &ExtractedTable) -> TableSchema {
        let columns = mapping
            .field_mappings
            .iter()
            .map(|field| {
                let sql_type = table
                    .column(&field.target_field)
                    .and_then(|c| Self::observed_datatype(c.column_type))
                    .unwrap_or_else(|| Self::map_datatype(field.data_type));
                ColumnSchema {
                    name: field.target_field.clone(),
                    sql_type: sql_type.to_string(),
                    nullable: None,
                    primary_key: field.is_primary_key,
                }
            })
            .collect();

        TableSchema {
            name: mapping.table_name().unwrap_or_default().to_string(),
            columns,
        }
    }

    /// Generate a single CREATE TABLE statement
    pub fn generate_ddl(&self, schema: &TableSchema) -> String {
        let mut column_defs: Vec<String> = schema
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("  {} {}", column.name, column.sql_type);
                if column.is_not_null() {
                    def.push_str(" NOT NULL");
                }
                def
            })
            .collect();

        let primary_key = schema.primary_key();
        if !primary_key.is_empty() {
            column_defs.push(format!("  PRIMARY KEY ({})", primary_key.join(", ")));
        }

        format!("CREATE TABLE {} (\n{}\n);", schema.name, column_defs.join(",\n"))
    }

    /// Generate batched multi-row INSERT statements.
    ///
    /// Columns follow the table's column order. An empty table yields no
    /// statements.
    pub fn generate_insert_statements(&self, table_name: &str, table: &ExtractedTable) -> Vec<String> {
        if table.row_count() == 0 || table.column_count() == 0 {
            return Vec::new();
        }

        let columns = table.column_names().join(", ");
        let rows: Vec<String> = table
            .rows()
            .map(|row| {
                let values: Vec<String> = row.into_iter().map(literal).collect();
                format!("({})", values.join(", "))
            })
            .collect();

        rows.chunks(self.batch_size)
            .map(|batch| {
                format!(
                    "INSERT INTO {} ({}) VALUES\n  {};",
                    table_name,
                    columns,
                    batch.join(",\n  ")
                )
            })
            .collect()
    }

    /// Write `<table>_ddl.sql`-style output to `path`
    pub fn write_ddl(&self, path: &Path, schema: &TableSchema) -> Result<(), ExportError> {
        debug!(table = %schema.name, dialect = %self.dialect, path = %path.display(), "Writing DDL");
        write_file(path, &self.generate_ddl(schema))
    }

    /// Write INSERT statements separated by blank lines to `path`
    pub fn write_inserts(
        &self,
        path: &Path,
        table_name: &str,
        table: &ExtractedTable,
    ) -> Result<usize, ExportError> {
        let statements = self.generate_insert_statements(table_name, table);
        debug!(
            table = table_name,
            statements = statements.len(),
            path = %path.display(),
            "Writing INSERT statements"
        );
        write_file(path, &statements.join("\n\n"))?;
        Ok(statements.len())
    }
}

/// Render a cell as a SQL literal
fn literal(value: &CellValue) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Integer(i) => i.to_string(),
        CellValue::Float(f) if !f.is_finite() => "NULL".to_string(),
        CellValue::Float(f) => format_float(*f),
        CellValue::Boolean(true) => "TRUE".to_string(),
        CellValue::Boolean(false) => "FALSE".to_string(),
        CellValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Column;
    use crate::mapping::FieldMapping;

    fn person_mapping() -> TableMapping {
        TableMapping {
            target_table: Some("PERSON".to_string()),
            record_set_id: None,
            description: None,
            field_mappings: vec![
                FieldMapping::new("person_id")
                    .with_data_type(ScalarType::Integer)
                    .with_primary_key(true),
                FieldMapping::new("birth_datetime").with_data_type(ScalarType::DateTime),
                FieldMapping::new("source_value"),
            ],
            primary_key: Some("person_id".to_string()),
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn test_map_datatype() {
        assert_eq!(SqlExporter::map_datatype(Some(ScalarType::Integer)), "INTEGER");
        assert_eq!(SqlExporter::map_datatype(Some(ScalarType::Text)), "VARCHAR(255)");
        assert_eq!(SqlExporter::map_datatype(Some(ScalarType::Date)), "DATE");
        assert_eq!(SqlExporter::map_datatype(Some(ScalarType::DateTime)), "TIMESTAMP");
        assert_eq!(SqlExporter::map_datatype(None), "VARCHAR(255)");
    }

    #[test]
    fn test_ddl_layout() {
        let schema = SqlExporter::table_schema(&person_mapping(), &ExtractedTable::default());
        let ddl = SqlExporter::default().generate_ddl(&schema);
        assert_eq!(
            ddl,
            "CREATE TABLE PERSON (\n  person_id INTEGER NOT NULL,\n  birth_datetime TIMESTAMP,\n  source_value VARCHAR(255),\n  PRIMARY KEY (person_id)\n);"
        );
    }

    #[test]
    fn test_observed_type_wins_over_declared() {
        let mut mapping = person_mapping();
        mapping.field_mappings[2] = FieldMapping::new("source_value").with_data_type(ScalarType::Text);
        let table = ExtractedTable::from_columns(vec![
            Column::new("person_id", vec![1.0.into()]),
            Column::new("source_value", vec![7.into()]),
        ])
        .unwrap();
        let schema = SqlExporter::table_schema(&mapping, &table);
        assert_eq!(schema.columns[0].sql_type, "FLOAT");
        assert_eq!(schema.columns[1].sql_type, "TIMESTAMP");
        assert_eq!(schema.columns[2].sql_type, "INTEGER");
    }

    #[test]
    fn test_nullable_override() {
        let mut schema = SqlExporter::table_schema(&person_mapping(), &ExtractedTable::default());
        schema.columns[2].nullable = Some(false);
        let ddl = SqlExporter::default().generate_ddl(&schema);
        assert!(ddl.contains("  source_value VARCHAR(255) NOT NULL"));
    }

    #[test]
    fn test_dialect_does_not_change_output() {
        let schema = SqlExporter::table_schema(&person_mapping(), &ExtractedTable::default());
        let postgres = SqlExporter::new(SqlDialect::PostgreSql).generate_ddl(&schema);
        let mysql = SqlExporter::new(SqlDialect::MySql).generate_ddl(&schema);
        let sqlite = SqlExporter::new(SqlDialect::Sqlite).generate_ddl(&schema);
        assert_eq!(postgres, mysql);
        assert_eq!(postgres, sqlite);
    }

    #[test]
    fn test_insert_literals() {
        let table = ExtractedTable::from_columns(vec![
            Column::new("id", vec![1.into(), 2.into()]),
            Column::new("name", vec!["O'Brien".into(), CellValue::Null]),
            Column::new("active", vec![true.into(), false.into()]),
        ])
        .unwrap();
        let statements = SqlExporter::default().generate_insert_statements("PERSON", &table);
        assert_eq!(
            statements,
            vec![
                "INSERT INTO PERSON (id, name, active) VALUES\n  (1, 'O''Brien', TRUE),\n  (2, NULL, FALSE);"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(literal(&CellValue::Float(2.0)), "2.0");
        assert_eq!(literal(&CellValue::Float(f64::NAN)), "NULL");
    }

    #[test]
    fn test_insert_batching() {
        let ids: Vec<CellValue> = (0..250).map(|i| CellValue::Integer(i)).collect();
        let table = ExtractedTable::from_columns(vec![Column::new("id", ids)]).unwrap();

        let statements = SqlExporter::default().generate_insert_statements("T", &table);
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[2].matches('(').count(), 1 + 50);

        let statements = SqlExporter::default()
            .with_batch_size(0)
            .generate_insert_statements("T", &table);
        assert_eq!(statements.len(), 250);
    }

    #[test]
    fn test_empty_table_has_no_inserts() {
        assert!(
            SqlExporter::default()
                .generate_insert_statements("T", &ExtractedTable::default())
                .is_empty()
        );
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgres".parse::<SqlDialect>().unwrap(), SqlDialect::PostgreSql);
        assert_eq!("MySQL".parse::<SqlDialect>().unwrap(), SqlDialect::MySql);
        assert!("oracle".parse::<SqlDialect>().is_err());
        assert_eq!(SqlDialect::Sqlite.to_string(), "sqlite");
    }
}
