//! Dynamically typed cell values.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single cell in a [`Table`](super::Table).
///
/// `Missing` is a value in its own right: it is never equal to `0` or to the
/// empty string, and steps treat it as "no data" rather than coercing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Value {
    /// Parse a raw cell as read from a delimited file.
    ///
    /// Null-like tokens become `Missing`, anything that parses as a float
    /// becomes a `Number`, everything else stays `Text`. Surrounding
    /// whitespace is dropped.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_null_value(trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value. Text is parsed leniently (a decimal comma
    /// is accepted) so that provider columns read as text still compute.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Integer view; only whole numbers qualify.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64()
            .filter(|n| n.fract() == 0.0 && n.abs() < 1e15)
            .map(|n| n as i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Canonical string form used as a lookup key.
    ///
    /// Whole numbers render without a fractional part so that a sediment
    /// code read as `56.0` keys the same as the text `"56"`.
    pub fn key(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Date(d) => d.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        if n.is_nan() {
            Value::Missing
        } else {
            Value::Number(n)
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

/// Check if a raw token represents a missing/null value.
pub fn is_null_value(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse(" NaN "), Value::Missing);
        assert_eq!(Value::parse("12.5"), Value::Number(12.5));
        assert_eq!(Value::parse("CS137"), Value::text("CS137"));
        assert_eq!(Value::parse("0"), Value::Number(0.0));
    }

    #[test]
    fn test_missing_is_not_zero_or_empty() {
        assert_ne!(Value::Missing, Value::Number(0.0));
        assert_ne!(Value::Missing, Value::text(""));
        assert_eq!(Value::Missing.as_f64(), None);
    }

    #[test]
    fn test_key_formats_whole_numbers() {
        assert_eq!(Value::Number(56.0).key(), "56");
        assert_eq!(Value::Number(12.5).key(), "12.5");
        assert_eq!(Value::text("56").key(), "56");
    }

    #[test]
    fn test_text_decimal_comma() {
        assert_eq!(Value::text("54,25").as_f64(), Some(54.25));
        assert_eq!(Value::text("abc").as_f64(), None);
    }
}
