//! Row and value representations for the pipeline

use std::collections::HashMap;

use chrono::NaiveDate;

/// Database column holding the unique application identifier
pub const ID_COLUMN: &str = "ApplicationID";

/// Canonical non-key fields of an application status record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Approved,
    ApprovedDate,
    SampleSent,
    SampleSentDate,
    ResultReceived,
    ResultDate,
    LeadExpert,
    SecondExpert,
    ThirdExpert,
}

impl Field {
    /// All canonical fields, in persisted-column order
    pub const ALL: [Field; 9] = [
        Field::Approved,
        Field::ApprovedDate,
        Field::SampleSent,
        Field::SampleSentDate,
        Field::ResultReceived,
        Field::ResultDate,
        Field::LeadExpert,
        Field::SecondExpert,
        Field::ThirdExpert,
    ];

    /// Column name in the persisted table
    pub fn column_name(&self) -> &'static str {
        match self {
            Field::Approved => "Approved",
            Field::ApprovedDate => "ApprovedDate",
            Field::SampleSent => "SampleSent",
            Field::SampleSentDate => "SampleSentDate",
            Field::ResultReceived => "ResultReceived",
            Field::ResultDate => "ResultDate",
            Field::LeadExpert => "LeadExpert",
            Field::SecondExpert => "SecondExpert",
            Field::ThirdExpert => "ThirdExpert",
        }
    }

    /// Whether this field holds a calendar date
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            Field::ApprovedDate | Field::SampleSentDate | Field::ResultDate
        )
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A cell value as read from the source spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Empty/blank cell
    Null,
    /// Text cell
    Text(String),
    /// Numeric cell (integer or float)
    Number(f64),
    /// Calendar date (no time component)
    Date(NaiveDate),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Raw table read from the source file: headers preserved verbatim,
/// cells decoded but otherwise untouched
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SourceTable {
    /// Index of a column by its exact header text
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

const NULL: Value = Value::Null;

/// A single canonical row produced by the transformer
#[derive(Debug, Clone)]
pub struct IncomingRow {
    /// Identifier as it appeared in the source (trimmed, original casing)
    pub application_id: String,
    values: HashMap<Field, Value>,
}

impl IncomingRow {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, field: Field, value: Value) {
        self.values.insert(field, value);
    }

    /// Value for a field; absent fields read as null
    pub fn value(&self, field: Field) -> &Value {
        self.values.get(&field).unwrap_or(&NULL)
    }
}

/// Canonical table: only the fields actually present in the source are
/// listed, which is what makes a field eligible for update downstream
#[derive(Debug, Clone)]
pub struct CanonicalTable {
    pub fields: Vec<Field>,
    pub rows: Vec<IncomingRow>,
}
