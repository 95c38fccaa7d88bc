//! Delimited-text exporter

use std::io::Write;
use std::path::Path;

use tracing::debug;

use super::ExportError;
use crate::extract::ExtractedTable;

/// Writes tables as comma-separated text with a header row.
///
/// Values are written as read: nulls become empty fields and floats keep
/// their decimal point, so the same input always produces the same bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl CsvExporter {
    /// Write a table to any writer
    pub fn write<W: Write>(&self, table: &ExtractedTable, writer: W) -> Result<(), ExportError> {
        let mut writer = csv::Writer::from_writer(writer);
        if table.column_count() > 0 {
            writer.write_record(table.column_names())?;
        }
        for row in table.rows() {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush().map_err(|e| ExportError::Csv(e.into()))
    }

    /// Render a table to a string
    pub fn to_csv_string(&self, table: &ExtractedTable) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        self.write(table, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ExportError::Encoding(e.to_string()))
    }

    /// Write a table to a file, replacing any existing content
    pub fn export(&self, table: &ExtractedTable, path: &Path) -> Result<(), ExportError> {
        debug!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "Writing CSV"
        );
        let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.write(table, std::io::BufWriter::new(file))
    }
}
