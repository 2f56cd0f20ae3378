//! Bulk CSV loading into heap tables.
//!
//! Parsing is separate from insertion: [`read_csv`] turns a file into
//! typed rows against a table schema, and the database inserts them in
//! one transaction.

use std::fs::File;
use std::path::Path;

use crate::catalog::{ColumnDef, TableSchema};
use crate::error::{HeapScanError, Result};
use crate::types::{DataType, Value};

/// Configuration for CSV import operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvImportConfig {
    /// Field separator (default: ',').
    pub delimiter: u8,
    /// Quote character (default: '"').
    pub quote: u8,
    /// Whether the first row is a header (default: true).
    pub has_header: bool,
    /// Number of data rows to skip before importing (default: 0).
    pub skip_rows: usize,
    /// Skip malformed rows instead of aborting (default: false).
    pub ignore_errors: bool,
}

impl Default for CsvImportConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_header: true,
            skip_rows: 0,
            ignore_errors: false,
        }
    }
}

impl CsvImportConfig {
    /// Creates a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether the file has a header row.
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Sets the number of data rows to skip.
    #[must_use]
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Sets whether to continue past malformed rows.
    #[must_use]
    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    /// Rows inserted into the table.
    pub rows_imported: u64,
    /// Rows skipped because they failed to parse.
    pub rows_failed: u64,
    /// One message per skipped row.
    pub errors: Vec<String>,
}

/// Parses `path` into rows matching `schema`'s column order.
///
/// With a header row, CSV columns are matched to table columns by name
/// and every table column must be present. Without one, CSV columns are
/// taken positionally.
///
/// # Errors
///
/// Returns `ImportError` for an unreadable file, a header that does not
/// cover the schema, or (unless `ignore_errors`) the first bad row.
pub fn read_csv(
    path: &Path,
    schema: &TableSchema,
    config: &CsvImportConfig,
) -> Result<(Vec<Vec<Value>>, ImportResult)> {
    let file = File::open(path)
        .map_err(|e| HeapScanError::ImportError(format!("Failed to open CSV file: {e}")))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .quote(config.quote)
        .has_headers(config.has_header)
        .flexible(config.ignore_errors)
        .from_reader(file);

    let column_indices = if config.has_header {
        let headers = reader
            .headers()
            .map_err(|e| HeapScanError::ImportError(format!("Failed to read header: {e}")))?;
        map_headers(headers, schema)?
    } else {
        (0..schema.columns.len()).collect()
    };

    let mut rows = Vec::new();
    let mut result = ImportResult::default();
    for (idx, record) in reader.records().enumerate().skip(config.skip_rows) {
        let line = idx + 1 + usize::from(config.has_header);
        let parsed = record
            .map_err(|e| format!("line {line}: {e}"))
            .and_then(|record| parse_record(&record, &column_indices, &schema.columns, line));
        match parsed {
            Ok(values) => {
                rows.push(values);
                result.rows_imported += 1;
            }
            Err(message) if config.ignore_errors => {
                result.rows_failed += 1;
                result.errors.push(message);
            }
            Err(message) => return Err(HeapScanError::ImportError(message)),
        }
    }
    Ok((rows, result))
}

fn map_headers(headers: &csv::StringRecord, schema: &TableSchema) -> Result<Vec<usize>> {
    schema
        .columns
        .iter()
        .map(|col| {
            headers
                .iter()
                .position(|h| h.trim() == col.name)
                .ok_or_else(|| {
                    HeapScanError::ImportError(format!(
                        "CSV header has no column '{}' for table '{}'",
                        col.name, schema.name
                    ))
                })
        })
        .collect()
}

fn parse_record(
    record: &csv::StringRecord,
    column_indices: &[usize],
    columns: &[ColumnDef],
    line: usize,
) -> std::result::Result<Vec<Value>, String> {
    column_indices
        .iter()
        .zip(columns)
        .map(|(&csv_idx, col)| {
            let field = record
                .get(csv_idx)
                .ok_or_else(|| format!("line {line}: missing field for column '{}'", col.name))?;
            parse_field(field, col).map_err(|e| format!("line {line}: {e}"))
        })
        .collect()
}

/// Parses one field for `col`. An empty field is NULL when the column allows it.
fn parse_field(field: &str, col: &ColumnDef) -> std::result::Result<Value, String> {
    if field.is_empty() {
        return if col.nullable {
            Ok(Value::Null)
        } else if col.data_type == DataType::String {
            Ok(Value::String(String::new()))
        } else {
            Err(format!("empty value for NOT NULL column '{}'", col.name))
        };
    }
    let invalid = |e: &dyn std::fmt::Display| {
        format!("invalid {} '{field}' for column '{}': {e}", col.data_type.name(), col.name)
    };
    match col.data_type {
        DataType::Int64 => field.trim().parse().map(Value::Int64).map_err(|e| invalid(&e)),
        DataType::Float64 => field.trim().parse().map(Value::Float64).map_err(|e| invalid(&e)),
        DataType::Bool => match field.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid(&"expected true or false")),
        },
        DataType::String => Ok(Value::String(field.to_string())),
    }
}
