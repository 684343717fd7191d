//! Read the source spreadsheet into an in-memory table

use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use log::{debug, info};

use super::error::EtlError;
use super::types::{SourceTable, Value};

/// Read the first worksheet of an Excel export into a [`SourceTable`].
///
/// Headers come from the first row and are preserved verbatim. Cells are
/// decoded into typed values (dates recognized where the sheet types them)
/// but not otherwise transformed. Fully empty rows are skipped.
pub fn extract(path: &Path) -> Result<SourceTable, EtlError> {
    info!("Extracting data from {}", path.display());

    let unavailable = |message: String| EtlError::SourceUnavailable {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| unavailable(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| unavailable("workbook has no sheets".into()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| unavailable(format!("failed to read sheet {}: {}", sheet_name, e)))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for row in rows_iter {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        if values.iter().all(Value::is_null) {
            continue;
        }
        rows.push(values);
    }

    debug!("Extracted {} rows from sheet {}", rows.len(), sheet_name);
    Ok(SourceTable { headers, rows })
}

/// Decode a cell into a typed value
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => {
            if s.trim().is_empty() {
                Value::Null
            } else {
                Value::Text(s.clone())
            }
        }
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Value::Date(ndt.date()),
            None => Value::Null,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

/// Render a header cell as text
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
