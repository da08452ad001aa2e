use crate::domain::{Record, Timestamp, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::{Map, Number, Value as JsonValue};
use std::path::Path;
use thiserror::Error;

const SECONDS_KEY: &str = "_seconds";
const NANOSECONDS_KEY: &str = "_nanoseconds";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Undefined value in field '{0}'")]
    UndefinedValue(String),

    #[error("Unsupported value in field '{0}'")]
    UnsupportedValue(String),

    #[error("Stored document {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Document {0} does not exist")]
    Missing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_sql(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// Equality filters, one ordering field and a limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Collection-oriented document storage.
///
/// Every write replaces or patches a whole document atomically; there is no
/// cross-document transaction and no physical delete.
pub trait DocumentStore {
    /// Write `record` at `id`, replacing any existing document.
    fn set(&self, collection: &str, id: &str, record: &Record) -> Result<(), StoreError>;
    /// Overwrite the top-level fields in `patch`, keeping the rest.
    fn merge(&self, collection: &str, id: &str, patch: &Record) -> Result<(), StoreError>;
    /// Raw read; soft-deleted documents are returned too.
    fn fetch(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;
    fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Record)>, StoreError>;
    fn count(&self, collection: &str) -> Result<usize, StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_owner
             ON documents(collection, json_extract(body, '$.userId'))",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_token
             ON documents(collection, json_extract(body, '$.verificationToken'))",
            [],
        )?;

        Ok(())
    }

    fn write_body(&self, collection: &str, id: &str, record: &Record) -> Result<(), StoreError> {
        let body = serde_json::to_string(&encode_record(record)?)?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
            params![collection, id, body],
        )?;
        Ok(())
    }

    fn read_body(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| decode_body(id, &body)).transpose()
    }
}

impl DocumentStore for SqliteStore {
    fn set(&self, collection: &str, id: &str, record: &Record) -> Result<(), StoreError> {
        self.write_body(collection, id, record)
    }

    fn merge(&self, collection: &str, id: &str, patch: &Record) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut record = self
            .read_body(collection, id)?
            .ok_or_else(|| StoreError::Missing(id.to_string()))?;
        for (key, value) in patch {
            record.insert(key.clone(), value.clone());
        }
        self.write_body(collection, id, &record)?;
        tx.commit()?;
        Ok(())
    }

    fn fetch(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        self.read_body(collection, id)
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Record)>, StoreError> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?1");
        let mut args = vec![SqlValue::Text(collection.to_string())];

        for (field, value) in &query.filters {
            let path = json_path(field)?;
            match filter_arg(field, value)? {
                SqlValue::Null => {
                    sql.push_str(&format!(" AND json_extract(body, '{}') IS NULL", path));
                }
                arg => {
                    args.push(arg);
                    sql.push_str(&format!(" AND json_extract(body, '{}') = ?{}", path, args.len()));
                }
            }
        }

        if let Some((field, direction)) = &query.order_by {
            let path = json_path(field)?;
            let dir = direction.as_sql();
            // Timestamps order by their seconds then nanoseconds; plain values by themselves.
            sql.push_str(&format!(
                " ORDER BY COALESCE(json_extract(body, '{path}.{SECONDS_KEY}'), json_extract(body, '{path}')) {dir},
                   json_extract(body, '{path}.{NANOSECONDS_KEY}') {dir}, id {dir}"
            ));
        }

        if let Some(limit) = query.limit {
            args.push(SqlValue::Integer(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", args.len()));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let record = decode_body(&id, &body)?;
            documents.push((id, record));
        }
        Ok(documents)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}

fn json_path(field: &str) -> Result<String, StoreError> {
    if field.is_empty() || field.contains(['"', '\'', '\\']) {
        return Err(StoreError::UnsupportedValue(field.to_string()));
    }
    Ok(format!("$.\"{}\"", field))
}

fn filter_arg(field: &str, value: &Value) -> Result<SqlValue, StoreError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        // json_extract reports JSON booleans as 0/1
        Value::Bool(b) => Ok(SqlValue::Integer(*b as i64)),
        Value::Integer(i) => Ok(SqlValue::Integer(*i)),
        Value::Float(f) => Ok(SqlValue::Real(*f)),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        _ => Err(StoreError::UnsupportedValue(field.to_string())),
    }
}

fn decode_body(id: &str, body: &str) -> Result<Record, StoreError> {
    match serde_json::from_str::<JsonValue>(body)? {
        JsonValue::Object(map) => Ok(decode_map(map)),
        _ => Err(StoreError::Corrupt {
            id: id.to_string(),
            reason: "body is not a JSON object".to_string(),
        }),
    }
}

/// Encode a record as stored JSON. Native dates are written as timestamps,
/// the same as timestamps proper.
pub fn encode_record(record: &Record) -> Result<JsonValue, StoreError> {
    let mut map = Map::new();
    for (key, value) in record {
        map.insert(key.clone(), encode_value(key, value)?);
    }
    Ok(JsonValue::Object(map))
}

fn encode_value(field: &str, value: &Value) -> Result<JsonValue, StoreError> {
    Ok(match value {
        Value::Undefined => return Err(StoreError::UndefinedValue(field.to_string())),
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .ok_or_else(|| StoreError::UnsupportedValue(field.to_string()))?,
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Date(instant) => encode_timestamp(&Timestamp::from_datetime(instant)),
        Value::Timestamp(ts) => encode_timestamp(ts),
        Value::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| encode_value(field, item))
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(inner) => encode_record(inner)?,
    })
}

fn encode_timestamp(ts: &Timestamp) -> JsonValue {
    let mut map = Map::new();
    map.insert(SECONDS_KEY.to_string(), JsonValue::from(ts.seconds));
    map.insert(NANOSECONDS_KEY.to_string(), JsonValue::from(ts.nanoseconds));
    JsonValue::Object(map)
}

pub fn decode_record(json: JsonValue) -> Option<Record> {
    match json {
        JsonValue::Object(map) => Some(decode_map(map)),
        _ => None,
    }
}

fn decode_map(map: Map<String, JsonValue>) -> Record {
    map.into_iter()
        .map(|(key, value)| (key, decode_value(value)))
        .collect()
}

fn decode_value(json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => Value::String(s),
        JsonValue::Array(items) => Value::Array(items.into_iter().map(decode_value).collect()),
        JsonValue::Object(map) => match decode_timestamp(&map) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Map(decode_map(map)),
        },
    }
}

fn decode_timestamp(map: &Map<String, JsonValue>) -> Option<Timestamp> {
    if map.len() != 2 {
        return None;
    }
    let seconds = map.get(SECONDS_KEY)?.as_i64()?;
    let nanoseconds = u32::try_from(map.get(NANOSECONDS_KEY)?.as_u64()?).ok()?;
    Some(Timestamp::new(seconds, nanoseconds))
}
