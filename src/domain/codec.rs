//! Conversion between native dates and the store's timestamp encoding, and
//! the sanitizer that runs before every write.

use super::document::fields;
use super::value::{Record, Timestamp, Value};

/// Date fields every stored document carries regardless of its type.
pub const SYSTEM_DATE_FIELDS: [&str; 3] = [fields::CREATED_AT, fields::UPDATED_AT, fields::DELETED_AT];

/// Encode the native dates held in `date_fields` as store timestamps.
pub fn to_storage(record: &Record, date_fields: &[&str]) -> Record {
    let mut encoded = record.clone();
    for field in date_fields {
        if let Some(Value::Date(instant)) = encoded.get(*field) {
            let ts = Timestamp::from_datetime(instant);
            encoded.insert((*field).to_string(), Value::Timestamp(ts));
        }
    }
    encoded
}

/// Decode store timestamps in `date_fields` and the system date fields back to
/// native dates. A missing `deletedAt` reads as `Null`.
pub fn to_native(record: &Record, date_fields: &[&str]) -> Record {
    let mut decoded = record.clone();
    for field in date_fields.iter().chain(SYSTEM_DATE_FIELDS.iter()) {
        if let Some(Value::Timestamp(ts)) = decoded.get(*field) {
            if let Some(instant) = ts.to_datetime() {
                decoded.insert((*field).to_string(), Value::Date(instant));
            }
        }
    }
    decoded
        .entry(fields::DELETED_AT.to_string())
        .or_insert(Value::Null);
    decoded
}

/// Remove every `Undefined` value, descending into maps and arrays.
pub fn strip_undefined(record: &Record) -> Record {
    record
        .iter()
        .filter(|(_, value)| !matches!(value, Value::Undefined))
        .map(|(key, value)| (key.clone(), strip_value(value)))
        .collect()
}

fn strip_value(value: &Value) -> Value {
    match value {
        Value::Map(inner) => Value::Map(strip_undefined(inner)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|item| !matches!(item, Value::Undefined))
                .map(strip_value)
                .collect(),
        ),
        other => other.clone(),
    }
}
