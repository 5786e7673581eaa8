//! Field value types for documents.
//!
//! A value is either text or a number. The same text value may be indexed as
//! full-text, tag and numeric at once, depending on the type flags it is
//! submitted with.
//!
//! ```
//! use quarry::document::field_value::FieldValue;
//!
//! let text = FieldValue::from("42");
//! assert_eq!(text.as_text(), Some("42"));
//! assert_eq!(text.as_numeric(), Some(42.0));
//!
//! let number = FieldValue::Numeric(2.5);
//! assert_eq!(number.to_string(), "2.5");
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Represents a value for a field in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Numeric value
    Numeric(f64),
}

impl FieldValue {
    /// Get the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Numeric(_) => None,
        }
    }

    /// Get the value as a number, parsing text if needed.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
        }
    }

    /// Check if this is a text value.
    pub fn is_text(&self) -> bool {
        matches!(self, FieldValue::Text(_))
    }

    /// Total order used for sorting: numbers before text, numbers by value,
    /// text by bytes.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Numeric(a), FieldValue::Numeric(b)) => a.total_cmp(b),
            (FieldValue::Numeric(_), FieldValue::Text(_)) => Ordering::Less,
            (FieldValue::Text(_), FieldValue::Numeric(_)) => Ordering::Greater,
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Numeric(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Numeric(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Numeric(value as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_parsing() {
        assert_eq!(FieldValue::from(" 3.5 ").as_numeric(), Some(3.5));
        assert_eq!(FieldValue::from("abc").as_numeric(), None);
        assert_eq!(FieldValue::from("NaN").as_numeric(), None);
        assert_eq!(FieldValue::from(7i64).as_numeric(), Some(7.0));
    }

    #[test]
    fn test_sort_cmp() {
        let mut values = vec![
            FieldValue::from("b"),
            FieldValue::from(10.0),
            FieldValue::from("a"),
            FieldValue::from(-1.0),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![
                FieldValue::from(-1.0),
                FieldValue::from(10.0),
                FieldValue::from("a"),
                FieldValue::from("b"),
            ]
        );
    }
}
