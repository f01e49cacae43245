//! Epoch timestamp canonicalization
//!
//! MISP reports instants as epoch seconds, either as JSON numbers or as
//! numeric strings. Parsed events carry them as local-time ISO-8601 strings
//! with whole-second precision and no offset, e.g. `2021-03-01T00:00:00`.

use crate::errors::{RelayError, Result};
use chrono::{DateTime, Local};
use serde_json::Value;

const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Converts an epoch value (seconds) to its canonical local-time form.
///
/// `field` only names the value in the error when it cannot be read as an
/// integer.
pub fn canonicalize(field: &str, value: &Value) -> Result<String> {
    let seconds = epoch_seconds(value).ok_or_else(|| conversion_error(field, value))?;
    let instant =
        DateTime::from_timestamp(seconds, 0).ok_or_else(|| conversion_error(field, value))?;

    Ok(instant
        .with_timezone(&Local)
        .naive_local()
        .format(CANONICAL_FORMAT)
        .to_string())
}

/// Same as [`canonicalize`] for a field that may be absent.
pub fn canonicalize_field(field: &str, value: Option<&Value>) -> Result<String> {
    canonicalize(field, value.unwrap_or(&Value::Null))
}

fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn conversion_error(field: &str, value: &Value) -> RelayError {
    RelayError::Conversion {
        field: field.to_string(),
        value: value.to_string(),
    }
}
