//! Value codec: turns raw cells into typed constraint values.
//!
//! `encode` is a pure function of (cell, value type, preprocessor, list
//! separator). A cell that is empty after trimming, or that fails type
//! coercion, contributes zero values - it never fails the row.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MigrateError, Result};

/// Attribute value types supported by the store schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Long,
    Double,
    Boolean,
    Datetime,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::Boolean => "boolean",
            ValueType::Datetime => "datetime",
        };
        f.write_str(name)
    }
}

/// A typed constraint value produced from one cell (or one list element).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Datetime(NaiveDateTime),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Datetime(_) => ValueType::Datetime,
        }
    }
}

impl fmt::Display for Value {
    /// Renders the value as a statement literal.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{:?}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Datetime(v) => {
                if chrono::Timelike::nanosecond(v) == 0 {
                    write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S"))
                } else {
                    write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.3f"))
                }
            }
        }
    }
}

/// Declarative preprocessor configuration.
///
/// An open set of named transforms; regex match/replace is the only one so
/// far.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreprocessorSpec {
    RegexReplace {
        #[serde(rename = "match")]
        pattern: String,
        replace: String,
    },
}

/// A compiled preprocessor, applied to the cleaned cell before type coercion.
#[derive(Debug, Clone)]
pub enum Preprocessor {
    RegexReplace { pattern: Regex, replace: String },
}

impl Preprocessor {
    /// Compile a preprocessor spec. A malformed regex is a configuration
    /// error.
    pub fn compile(spec: &PreprocessorSpec) -> Result<Self> {
        match spec {
            PreprocessorSpec::RegexReplace { pattern, replace } => {
                let pattern = Regex::new(pattern).map_err(|e| {
                    MigrateError::config(format!("invalid preprocessor regex '{}': {}", pattern, e))
                })?;
                Ok(Preprocessor::RegexReplace {
                    pattern,
                    replace: replace.clone(),
                })
            }
        }
    }

    pub fn apply(&self, input: &str) -> String {
        match self {
            Preprocessor::RegexReplace { pattern, replace } => {
                pattern.replace_all(input, replace.as_str()).into_owned()
            }
        }
    }
}

/// Encode one raw cell into zero or more typed values.
///
/// The cell is split on `list_separator` first (if configured), then each
/// piece is trimmed, preprocessed, and coerced to `value_type`. Pieces that
/// end up empty or fail coercion are dropped with a warning.
pub fn encode(
    cell: &str,
    value_type: ValueType,
    preprocessor: Option<&Preprocessor>,
    list_separator: Option<&str>,
) -> Vec<Value> {
    let pieces: Vec<&str> = match list_separator {
        Some(sep) if !sep.is_empty() => cell.split(sep).collect(),
        _ => vec![cell],
    };

    let mut values = Vec::new();
    for piece in pieces {
        let cleaned = piece.trim();
        if cleaned.is_empty() {
            continue;
        }
        let cleaned = match preprocessor {
            Some(p) => p.apply(cleaned),
            None => cleaned.to_string(),
        };
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            continue;
        }
        if let Some(value) = coerce(cleaned, value_type) {
            values.push(value);
        }
    }
    values
}

/// Coerce one cleaned string into a typed value. Returns None (with a
/// warning) when the string does not parse as the requested type.
fn coerce(cleaned: &str, value_type: ValueType) -> Option<Value> {
    match value_type {
        ValueType::String => Some(Value::String(cleaned.to_string())),
        ValueType::Long => match cleaned.parse::<i64>() {
            Ok(v) => Some(Value::Long(v)),
            Err(_) => {
                warn!("cell '{}' is not a long, dropping constraint", cleaned);
                None
            }
        },
        ValueType::Double => match cleaned.parse::<f64>() {
            Ok(v) => Some(Value::Double(v)),
            Err(_) => {
                warn!("cell '{}' is not a double, dropping constraint", cleaned);
                None
            }
        },
        ValueType::Boolean => {
            if cleaned.eq_ignore_ascii_case("true") {
                Some(Value::Boolean(true))
            } else if cleaned.eq_ignore_ascii_case("false") {
                Some(Value::Boolean(false))
            } else {
                warn!("cell '{}' is not a boolean, dropping constraint", cleaned);
                None
            }
        }
        ValueType::Datetime => parse_datetime(cleaned).or_else(|| {
            warn!("cell '{}' is not a datetime, dropping constraint", cleaned);
            None
        }),
    }
}

/// ISO-8601 date or date-time; a bare date means start of day.
fn parse_datetime(cleaned: &str) -> Option<Value> {
    if let Ok(dt) = cleaned.parse::<NaiveDateTime>() {
        return Some(Value::Datetime(dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(cleaned, "%Y-%m-%d") {
        return Some(Value::Datetime(date.and_hms_opt(0, 0, 0)?));
    }
    None
}
