//! Encode cell values into statement parameters
//!
//! Pure and total: every value maps to a bind parameter, malformed input
//! degrades to its plain textual form rather than failing. Values are bound
//! as typed parameters; the literal rendering exists only so the executed
//! statement can be logged in full.

use chrono::NaiveDate;

use super::types::Value;

/// A value ready to bind into an UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// SQL NULL
    Null,
    /// Tri-state status code: 1 = yes, 2 = no, 3 = unknown
    Status(i64),
    /// Free text, title-cased
    Text(String),
    /// Numeric cell passed through as-is
    Number(f64),
    /// Calendar date, persisted as `YYYY-MM-DD`
    Date(NaiveDate),
}

/// Encode a single cell value into its persisted form.
///
/// Status words ("yes"/"no"/"unknown", matched after trimming and
/// lowercasing) become the numeric codes 1/2/3. Any other text is treated
/// as free text (expert names) and title-cased. Dates keep their calendar
/// value; nulls stay null.
pub fn encode(value: &Value) -> BindValue {
    match value {
        Value::Null => BindValue::Null,
        Value::Date(d) => BindValue::Date(*d),
        Value::Number(n) => BindValue::Number(*n),
        Value::Text(s) => {
            let trimmed = s.trim();
            match trimmed.to_lowercase().as_str() {
                "yes" => BindValue::Status(1),
                "no" => BindValue::Status(2),
                "unknown" => BindValue::Status(3),
                _ => BindValue::Text(title_case(trimmed)),
            }
        }
    }
}

impl BindValue {
    /// Render as a SQL literal, for logging the statement that was bound.
    /// Embedded quotes are doubled; status codes render as plain numbers.
    pub fn literal(&self) -> String {
        match self {
            BindValue::Null => "NULL".to_string(),
            BindValue::Status(code) => code.to_string(),
            BindValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            BindValue::Number(n) => {
                if n.fract() == 0.0 {
                    (*n as i64).to_string()
                } else {
                    n.to_string()
                }
            }
            BindValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        }
    }
}

/// Uppercase the first letter of each word, lowercase the rest.
/// A word starts after any non-alphabetic character, so "o'brien"
/// becomes "O'Brien".
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_words_map_to_codes() {
        assert_eq!(encode(&Value::Text("yes".into())), BindValue::Status(1));
        assert_eq!(encode(&Value::Text("no".into())), BindValue::Status(2));
        assert_eq!(encode(&Value::Text("unknown".into())), BindValue::Status(3));
    }

    #[test]
    fn test_status_matching_trims_and_ignores_case() {
        assert_eq!(encode(&Value::Text("YES".into())), BindValue::Status(1));
        assert_eq!(encode(&Value::Text(" Yes ".into())), BindValue::Status(1));
        assert_eq!(encode(&Value::Text("No".into())), BindValue::Status(2));
        assert_eq!(encode(&Value::Text("UNKNOWN".into())), BindValue::Status(3));
    }

    #[test]
    fn test_free_text_is_title_cased() {
        assert_eq!(
            encode(&Value::Text("jane doe".into())),
            BindValue::Text("Jane Doe".into())
        );
        assert_eq!(
            encode(&Value::Text("  MIRIAM o'brien ".into())),
            BindValue::Text("Miriam O'Brien".into())
        );
    }

    #[test]
    fn test_null_stays_null() {
        assert_eq!(encode(&Value::Null), BindValue::Null);
        assert_eq!(BindValue::Null.literal(), "NULL");
    }

    #[test]
    fn test_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let encoded = encode(&Value::Date(date));
        assert_eq!(encoded, BindValue::Date(date));
        assert_eq!(encoded.literal(), "'2024-03-05'");
        let parsed = NaiveDate::parse_from_str("2024-03-05", "%Y-%m-%d").unwrap();
        assert_eq!(parsed, date);
    }

    #[test]
    fn test_literal_doubles_embedded_quotes() {
        let encoded = encode(&Value::Text("d'arcy".into()));
        assert_eq!(encoded, BindValue::Text("D'Arcy".into()));
        assert_eq!(encoded.literal(), "'D''Arcy'");
    }

    #[test]
    fn test_status_literal_is_plain_numeric() {
        assert_eq!(encode(&Value::Text("Yes".into())).literal(), "1");
    }

    #[test]
    fn test_number_passes_through_unquoted() {
        assert_eq!(encode(&Value::Number(3.0)), BindValue::Number(3.0));
        assert_eq!(BindValue::Number(3.0).literal(), "3");
        assert_eq!(BindValue::Number(2.5).literal(), "2.5");
    }
}
