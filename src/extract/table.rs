//! In-memory columnar table

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ExtractError;
use crate::mapping::TableMapping;

/// Tokens read as missing values, matching common tabular readers
const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NULL", "null", "NaN", "nan", "#N/A", "<NA>",
];

/// A single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Hashable identity used for uniqueness and membership checks.
    ///
    /// Integral floats compare equal to the matching integer so that a key
    /// column read as FLOAT still matches an INTEGER reference column.
    pub fn key(&self) -> Option<CellKey> {
        match self {
            CellValue::Null => None,
            CellValue::Integer(i) => Some(CellKey::Integer(*i)),
            CellValue::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(CellKey::Integer(*f as i64))
                } else if f.is_nan() {
                    Some(CellKey::Float(f64::NAN.to_bits()))
                } else {
                    Some(CellKey::Float(f.to_bits()))
                }
            }
            CellValue::Boolean(b) => Some(CellKey::Boolean(*b)),
            CellValue::Text(s) => Some(CellKey::Text(s.clone())),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(v) => f.write_str(&format_float(*v)),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Boolean(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// Hashable cell identity, see [`CellValue::key`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Integer(i64),
    Float(u64),
    Boolean(bool),
    Text(String),
}

/// Format a float so integral values keep a decimal point (`1.0`)
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let s = if value > 0.0 { "inf" } else { "-inf" };
        s.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Observed representation of a whole column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    /// No non-null values
    Empty,
}

impl ColumnType {
    /// Decide the type of a column of raw text cells (`None` = missing)
    fn infer_raw(cells: &[Option<&str>]) -> Self {
        let present: Vec<&str> = cells.iter().flatten().copied().collect();
        if present.is_empty() {
            ColumnType::Empty
        } else if present.iter().all(|s| s.parse::<i64>().is_ok()) {
            ColumnType::Integer
        } else if present.iter().all(|s| s.parse::<f64>().is_ok()) {
            ColumnType::Float
        } else if present.iter().all(|s| parse_bool(s).is_some()) {
            ColumnType::Boolean
        } else {
            ColumnType::Text
        }
    }

    /// Decide the type of a column of already-typed cells
    fn infer_values(values: &[CellValue]) -> Self {
        let mut present = values.iter().filter(|v| !v.is_null()).peekable();
        if present.peek().is_none() {
            return ColumnType::Empty;
        }
        let (mut ints, mut floats, mut bools, mut total) = (0, 0, 0, 0);
        for value in present {
            total += 1;
            match value {
                CellValue::Integer(_) => ints += 1,
                CellValue::Float(_) => floats += 1,
                CellValue::Boolean(_) => bools += 1,
                _ => {}
            }
        }
        if ints == total {
            ColumnType::Integer
        } else if ints + floats == total {
            ColumnType::Float
        } else if bools == total {
            ColumnType::Boolean
        } else {
            ColumnType::Text
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_cell(raw: Option<&str>, column_type: ColumnType) -> CellValue {
    let Some(raw) = raw else {
        return CellValue::Null;
    };
    match column_type {
        ColumnType::Integer => raw.parse().map(CellValue::Integer).unwrap_or(CellValue::Null),
        ColumnType::Float => raw.parse().map(CellValue::Float).unwrap_or(CellValue::Null),
        ColumnType::Boolean => parse_bool(raw).map(CellValue::Boolean).unwrap_or(CellValue::Null),
        ColumnType::Text => CellValue::Text(raw.to_string()),
        ColumnType::Empty => CellValue::Null,
    }
}

/// A named column with its observed type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub values: Vec<CellValue>,
}

impl Column {
    /// Build a column from typed values, deciding its observed type
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        let column_type = ColumnType::infer_values(&values);
        let values = if column_type == ColumnType::Float {
            values
                .into_iter()
                .map(|v| match v {
                    CellValue::Integer(i) => CellValue::Float(i as f64),
                    other => other,
                })
                .collect()
        } else {
            values
        };
        Self {
            name: name.into(),
            column_type,
            values,
        }
    }

    /// Build a column from raw text cells as read from a delimited file
    pub fn from_raw(name: impl Into<String>, raw: &[&str]) -> Self {
        let cells: Vec<Option<&str>> = raw
            .iter()
            .map(|s| (!NULL_TOKENS.contains(s)).then_some(*s))
            .collect();
        let column_type = ColumnType::infer_raw(&cells);
        let values = cells
            .iter()
            .map(|cell| parse_cell(*cell, column_type))
            .collect();
        Self {
            name: name.into(),
            column_type,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// Columnar table read from one distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    columns: Vec<Column>,
    row_count: usize,
}

impl ExtractedTable {
    /// Build a table from columns of equal length
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, ExtractError> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(ExtractError::Shape(format!(
                "column '{}' has {} values, expected {}",
                bad.name,
                bad.len(),
                row_count
            )));
        }
        Ok(Self { columns, row_count })
    }

    /// Build a table from a header and raw text rows
    pub fn from_raw_rows(headers: &[String], rows: &[Vec<String>]) -> Result<Self, ExtractError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(ExtractError::Shape(format!(
                "row {} has {} fields, expected {}",
                idx + 1,
                row.len(),
                headers.len()
            )));
        }
        let columns = headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let raw: Vec<&str> = rows.iter().map(|row| row[col].as_str()).collect();
                Column::from_raw(name.clone(), &raw)
            })
            .collect();
        Ok(Self {
            columns,
            row_count: rows.len(),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Iterate rows in order, each row in column order
    pub fn rows(&self) -> impl Iterator<Item = Vec<&CellValue>> + '_ {
        (0..self.row_count).map(move |row| self.columns.iter().map(|c| &c.values[row]).collect())
    }

    /// Rename columns named after a field's source name to its target name.
    ///
    /// Column order and unmapped columns are left untouched. A rename that
    /// would collide with an existing column is skipped. Returns the number
    /// of renamed columns.
    pub fn rename_columns(&mut self, mapping: &TableMapping) -> usize {
        let renames: HashMap<&str, &str> = mapping
            .field_mappings
            .iter()
            .filter(|m| m.source_field != m.target_field)
            .map(|m| (m.source_field.as_str(), m.target_field.as_str()))
            .collect();
        if renames.is_empty() {
            return 0;
        }

        let mut renamed = 0;
        for idx in 0..self.columns.len() {
            let Some(target) = renames.get(self.columns[idx].name.as_str()).copied() else {
                continue;
            };
            if self.has_column(target) {
                warn!(
                    column = %self.columns[idx].name,
                    target,
                    "Skipping rename onto existing column"
                );
                continue;
            }
            self.columns[idx].name = target.to_string();
            renamed += 1;
        }
        renamed
    }
}
