use crate::domain::{fields, Document, Record, Value};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

/// Body of a copy request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    /// Number for the copy; the source number is kept when absent.
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

/// Body of a cancel request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Convert an API request body into a record. Strings in `date_fields` are
/// read as RFC 3339 instants or plain `YYYY-MM-DD` days (midnight UTC).
pub fn record_from_json(json: JsonValue, date_fields: &[&str]) -> Option<Record> {
    let JsonValue::Object(map) = json else {
        return None;
    };

    let mut record = Record::new();
    for (key, value) in map {
        let value = match value {
            JsonValue::String(s) if date_fields.contains(&key.as_str()) => {
                parse_date(&s).map(Value::Date).unwrap_or(Value::String(s))
            }
            other => value_from_json(other),
        };
        record.insert(key, value);
    }
    Some(record)
}

fn value_from_json(json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => Value::String(s),
        JsonValue::Array(items) => Value::Array(items.into_iter().map(value_from_json).collect()),
        JsonValue::Object(map) => Value::Map(
            map.into_iter()
                .map(|(key, value)| (key, value_from_json(value)))
                .collect(),
        ),
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

pub fn record_to_json(record: &Record) -> JsonValue {
    JsonValue::Object(
        record
            .iter()
            .filter(|(_, value)| !matches!(value, Value::Undefined))
            .map(|(key, value)| (key.clone(), value_to_json(value)))
            .collect(),
    )
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Undefined | Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Date(instant) => JsonValue::String(format_date(instant)),
        Value::Timestamp(ts) => ts
            .to_datetime()
            .map_or(JsonValue::Null, |instant| JsonValue::String(format_date(&instant))),
        Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Map(inner) => record_to_json(inner),
    }
}

fn format_date(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// The API representation of a document: payload fields plus system fields.
pub fn document_to_json(doc: &Document) -> JsonValue {
    let mut map = match record_to_json(&doc.fields) {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    };
    let date = |d: &Option<DateTime<Utc>>| d.as_ref().map_or(JsonValue::Null, |d| JsonValue::String(format_date(d)));

    map.insert("id".into(), doc.id.clone().into());
    map.insert(fields::USER_ID.into(), doc.user_id.clone().into());
    map.insert(fields::ORGANIZATION_ID.into(), doc.organization_id.clone().into());
    map.insert(fields::VERIFICATION_TOKEN.into(), doc.verification_token.clone().into());
    map.insert(fields::DOCUMENT_STATUS.into(), doc.status.as_str().into());
    map.insert(fields::IS_DELETED.into(), doc.is_deleted.into());
    map.insert(fields::DELETED_AT.into(), date(&doc.deleted_at));
    map.insert(fields::CREATED_AT.into(), format_date(&doc.created_at).into());
    map.insert(fields::UPDATED_AT.into(), format_date(&doc.updated_at).into());
    map.insert(fields::CANCELLED_AT.into(), date(&doc.cancelled_at));
    if let Some(reason) = &doc.cancellation_reason {
        map.insert(fields::CANCELLATION_REASON.into(), reason.clone().into());
    }
    map.insert(fields::IS_LOCKED.into(), doc.is_locked.into());
    map.insert(fields::IS_ARCHIVED.into(), doc.is_archived.into());
    JsonValue::Object(map)
}
