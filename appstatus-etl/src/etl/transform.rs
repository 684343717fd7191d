//! Rename source columns to the canonical schema and normalize dates

use chrono::NaiveDate;
use log::{info, warn};

use super::types::{CanonicalTable, Field, IncomingRow, SourceTable, Value};

/// Source header carrying the application identifier
const SOURCE_ID_HEADER: &str = "PID";

/// Fixed source-header-to-canonical-field mapping. Source columns not
/// listed here are dropped; listed columns absent from the source are
/// omitted from the canonical table rather than synthesized as nulls,
/// which keeps them out of reach of the loader entirely.
const COLUMN_MAPPING: [(&str, Field); 9] = [
    ("Approved", Field::Approved),
    ("Approved Date", Field::ApprovedDate),
    ("sample sent", Field::SampleSent),
    ("sample sent date", Field::SampleSentDate),
    ("results received", Field::ResultReceived),
    ("results received date", Field::ResultDate),
    ("Lead expert", Field::LeadExpert),
    ("Expert 2", Field::SecondExpert),
    ("Expert 3", Field::ThirdExpert),
];

/// Produce the canonical table from a raw source table.
///
/// Total: malformed cells degrade to null, rows without an identifier are
/// dropped with a warning, and a missing identifier column yields an empty
/// table instead of an error.
pub fn transform(source: &SourceTable) -> CanonicalTable {
    info!("Transforming data");

    let Some(id_index) = source.column_index(SOURCE_ID_HEADER) else {
        warn!(
            "Source has no {} column; nothing to transform",
            SOURCE_ID_HEADER
        );
        return CanonicalTable {
            fields: Vec::new(),
            rows: Vec::new(),
        };
    };

    // (field, source column index) for the columns actually present
    let present: Vec<(Field, usize)> = COLUMN_MAPPING
        .iter()
        .filter_map(|(header, field)| source.column_index(header).map(|idx| (*field, idx)))
        .collect();

    let mut rows = Vec::new();
    for source_row in &source.rows {
        let id = source_row
            .get(id_index)
            .map(identifier_text)
            .unwrap_or_default();
        if id.is_empty() {
            warn!("Skipping row with blank {}", SOURCE_ID_HEADER);
            continue;
        }

        let mut row = IncomingRow::new(id);
        for (field, idx) in &present {
            let cell = source_row.get(*idx).cloned().unwrap_or(Value::Null);
            let value = if field.is_date() {
                normalize_date(&cell)
            } else {
                cell
            };
            row.set(*field, value);
        }
        rows.push(row);
    }

    info!("Data transformation completed ({} rows)", rows.len());
    CanonicalTable {
        fields: present.iter().map(|(field, _)| *field).collect(),
        rows,
    }
}

/// Render an identifier cell as trimmed text
fn identifier_text(cell: &Value) -> String {
    match cell {
        Value::Text(s) => s.trim().to_string(),
        Value::Number(n) => {
            if n.fract() == 0.0 {
                (*n as i64).to_string()
            } else {
                n.to_string()
            }
        }
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::Null => String::new(),
    }
}

/// Coerce a date-bearing cell to a calendar date; unparsable values
/// become null so the pipeline keeps running
fn normalize_date(cell: &Value) -> Value {
    match cell {
        Value::Date(d) => Value::Date(*d),
        Value::Text(s) => match parse_date_text(s) {
            Some(d) => Value::Date(d),
            None => Value::Null,
        },
        _ => Value::Null,
    }
}

// Ambiguous numeric dates resolve month-first; day-first is only a
// fallback for values month-first cannot parse
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d %b %Y",
];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(headers: &[&str], rows: Vec<Vec<Value>>) -> SourceTable {
        SourceTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_renames_and_drops_unknown_columns() {
        let table = transform(&source(
            &["PID", "Approved", "Comments"],
            vec![vec![
                Value::Text("abc123".into()),
                Value::Text("Yes".into()),
                Value::Text("ignore me".into()),
            ]],
        ));

        assert_eq!(table.fields, vec![Field::Approved]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].application_id, "abc123");
        assert_eq!(
            table.rows[0].value(Field::Approved),
            &Value::Text("Yes".into())
        );
    }

    #[test]
    fn test_absent_columns_are_omitted_not_synthesized() {
        let table = transform(&source(
            &["PID", "Lead expert"],
            vec![vec![Value::Text("abc123".into()), Value::Null]],
        ));
        assert_eq!(table.fields, vec![Field::LeadExpert]);
        assert!(!table.fields.contains(&Field::Approved));
    }

    #[test]
    fn test_date_normalization() {
        let table = transform(&source(
            &["PID", "Approved Date", "sample sent date", "results received date"],
            vec![vec![
                Value::Text("abc123".into()),
                Value::Text("05/03/2024".into()),
                Value::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
                Value::Text("not a date".into()),
            ]],
        ));

        let row = &table.rows[0];
        assert_eq!(
            row.value(Field::ApprovedDate).as_date(),
            NaiveDate::from_ymd_opt(2024, 5, 3)
        );
        assert_eq!(
            row.value(Field::SampleSentDate).as_date(),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        // unparsable dates degrade to null, the run keeps going
        assert!(row.value(Field::ResultDate).is_null());
    }

    #[test]
    fn test_slash_dates_parse_month_first() {
        assert_eq!(
            parse_date_text("05/03/2024"),
            NaiveDate::from_ymd_opt(2024, 5, 3)
        );
        // day-first only when month-first cannot apply
        assert_eq!(
            parse_date_text("25/12/2024"),
            NaiveDate::from_ymd_opt(2024, 12, 25)
        );
    }

    #[test]
    fn test_blank_identifier_skips_row() {
        let table = transform(&source(
            &["PID", "Approved"],
            vec![
                vec![Value::Text("  ".into()), Value::Text("Yes".into())],
                vec![Value::Text("abc123".into()), Value::Text("No".into())],
            ],
        ));
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].application_id, "abc123");
    }

    #[test]
    fn test_numeric_identifier_renders_without_decimal() {
        let table = transform(&source(
            &["PID"],
            vec![vec![Value::Number(1042.0)]],
        ));
        assert_eq!(table.rows[0].application_id, "1042");
    }

    #[test]
    fn test_missing_identifier_column_yields_empty_table() {
        let table = transform(&source(
            &["Approved"],
            vec![vec![Value::Text("Yes".into())]],
        ));
        assert!(table.fields.is_empty());
        assert!(table.rows.is_empty());
    }
}
