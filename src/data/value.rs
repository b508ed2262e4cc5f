//! Cell values for harmonized tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokens treated as missing when parsing raw text.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "na", "NaN", "nan", "N/A"];

/// A single table cell: numeric measurement, text label, or missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value (ROI measurement, numeric ID, numeric site code).
    Number(f64),
    /// Text value (subject ID, categorical label).
    Text(String),
    /// Missing value.
    Missing,
}

impl Value {
    /// Infer a value from raw text: missing tokens, then numbers, then text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_nan() => Value::Missing,
            Ok(v) => Value::Number(v),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    /// Parse raw text without numeric inference.
    pub fn parse_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            Value::Missing
        } else {
            Value::Text(trimmed.to_string())
        }
    }

    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Try to get as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical string form used for equality across tables.
    ///
    /// Integral numbers render without a fractional part, so `1001.0` and the
    /// text `"1001"` share the key `"1001"`. Missing values have no key.
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Number(v) => Some(format_number(*v)),
            Value::Text(s) => Some(s.clone()),
            Value::Missing => None,
        }
    }

    /// Key with numeric coercion: text that parses as a number compares by
    /// its numeric value, so `"0051456"` and `51456` share a key.
    pub fn numeric_key(&self) -> Option<String> {
        match self {
            Value::Text(s) => {
                let t = s.trim();
                // integral IDs beyond f64 precision must stay distinct
                if let Ok(n) = t.parse::<i64>() {
                    return Some(n.to_string());
                }
                if let Ok(n) = t.parse::<u64>() {
                    return Some(n.to_string());
                }
                match t.parse::<f64>() {
                    Ok(v) if v.is_finite() => Some(format_number(v)),
                    _ => Some(s.clone()),
                }
            }
            other => other.key(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", format_number(*v)),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
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
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}
