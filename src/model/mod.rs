//! Typed catalog records
//!
//! Every entity the sync persists has a record struct here with a pure
//! `from_remote_record` constructor that maps one JSON object from the catalog
//! API onto typed fields. Missing or malformed fields surface as
//! [`RecordError`] instead of being silently defaulted.

mod catalog;
mod shipping;

pub use catalog::{CategoryRecord, CategoryRef, Dimensions, ProductRecord, VariationRecord};
pub use shipping::{
    extract_class_rates, ClassRate, ShippingClassRecord, ShippingMethodRecord,
    ShippingZoneRecord, ZoneLocation, DEFAULT_CALC_TYPE,
};

use serde_json::{Map, Value};
use thiserror::Error;

/// Validation failure while mapping a remote record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' has an invalid value (expected {expected})")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Best-effort remote id of a record, used for failure reporting
pub fn remote_id_hint(record: &Value) -> Option<i64> {
    record.get("id").and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn as_object(record: &Value) -> RecordResult<&Map<String, Value>> {
    record.as_object().ok_or(RecordError::NotAnObject)
}

fn invalid(field: &str, expected: &'static str) -> RecordError {
    RecordError::InvalidField {
        field: field.to_string(),
        expected,
    }
}

/// Required integer identifier; numeric strings are accepted
pub(crate) fn required_id(record: &Map<String, Value>, field: &str) -> RecordResult<i64> {
    match record.get(field) {
        None | Some(Value::Null) => Err(RecordError::MissingField(field.to_string())),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| invalid(field, "integer")),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid(field, "integer")),
        Some(_) => Err(invalid(field, "integer")),
    }
}

/// Optional integer; absent, null and blank strings map to `None`
pub(crate) fn optional_int(record: &Map<String, Value>, field: &str) -> RecordResult<Option<i64>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| invalid(field, "integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(field, "integer")),
        Some(_) => Err(invalid(field, "integer")),
    }
}

/// Text field; absent or null becomes the empty string, scalars are stringified
pub(crate) fn text(record: &Map<String, Value>, field: &str) -> RecordResult<String> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(invalid(field, "string")),
    }
}

/// Text field with a fallback for absent or blank values
pub(crate) fn text_or(record: &Map<String, Value>, field: &str, default: &str) -> RecordResult<String> {
    let value = text(record, field)?;
    if value.trim().is_empty() {
        Ok(default.to_string())
    } else {
        Ok(value)
    }
}

/// Boolean flag with a default for absent or null values
pub(crate) fn flag(record: &Map<String, Value>, field: &str, default: bool) -> RecordResult<bool> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            _ => Err(invalid(field, "boolean")),
        },
        Some(_) => Err(invalid(field, "boolean")),
    }
}

/// Array field; absent or null becomes empty
pub(crate) fn array<'a>(record: &'a Map<String, Value>, field: &str) -> RecordResult<&'a [Value]> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(invalid(field, "array")),
    }
}
