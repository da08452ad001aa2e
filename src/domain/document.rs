use super::value::{Record, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Names of the system fields stamped onto every stored document.
pub mod fields {
    pub const USER_ID: &str = "userId";
    pub const ORGANIZATION_ID: &str = "organizationId";
    pub const VERIFICATION_TOKEN: &str = "verificationToken";
    pub const DOCUMENT_STATUS: &str = "documentStatus";
    pub const IS_DELETED: &str = "isDeleted";
    pub const DELETED_AT: &str = "deletedAt";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const CANCELLED_AT: &str = "cancelledAt";
    pub const CANCELLATION_REASON: &str = "cancellationReason";
    pub const IS_LOCKED: &str = "isLocked";
    pub const IS_ARCHIVED: &str = "isArchived";

    /// Fields owned by the service rather than the document payload.
    pub const SYSTEM: [&str; 12] = [
        USER_ID,
        ORGANIZATION_ID,
        VERIFICATION_TOKEN,
        DOCUMENT_STATUS,
        IS_DELETED,
        DELETED_AT,
        CREATED_AT,
        UPDATED_AT,
        CANCELLED_AT,
        CANCELLATION_REASON,
        IS_LOCKED,
        IS_ARCHIVED,
    ];

    /// Set once by save and delete; never taken from an update patch.
    pub const PROTECTED: [&str; 7] = [
        USER_ID,
        ORGANIZATION_ID,
        VERIFICATION_TOKEN,
        IS_DELETED,
        DELETED_AT,
        CREATED_AT,
        UPDATED_AT,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Active,
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Active => "active",
            DocumentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown document status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for DocumentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(DocumentStatus::Active),
            "cancelled" => Ok(DocumentStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Document {id} has a missing or malformed '{field}' field")]
pub struct MalformedDocument {
    pub id: String,
    pub field: &'static str,
}

/// A stored document with its system fields lifted out of the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub organization_id: Option<String>,
    pub verification_token: Option<String>,
    pub status: DocumentStatus,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub is_locked: bool,
    pub is_archived: bool,
    /// Type-specific payload, system fields excluded.
    pub fields: Record,
}

impl Document {
    /// Build a document from a record whose dates are already native.
    pub fn from_record(id: &str, mut record: Record) -> Result<Self, MalformedDocument> {
        let malformed = |field| MalformedDocument {
            id: id.to_string(),
            field,
        };

        let user_id = match record.remove(fields::USER_ID) {
            Some(Value::String(uid)) => uid,
            _ => return Err(malformed(fields::USER_ID)),
        };
        let created_at = record
            .remove(fields::CREATED_AT)
            .and_then(|v| v.as_date())
            .ok_or_else(|| malformed(fields::CREATED_AT))?;
        let updated_at = record
            .remove(fields::UPDATED_AT)
            .and_then(|v| v.as_date())
            .unwrap_or(created_at);

        let status = match record.remove(fields::DOCUMENT_STATUS) {
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_| malformed(fields::DOCUMENT_STATUS))?,
            _ => DocumentStatus::Active,
        };

        Ok(Self {
            id: id.to_string(),
            user_id,
            organization_id: take_string(&mut record, fields::ORGANIZATION_ID),
            verification_token: take_string(&mut record, fields::VERIFICATION_TOKEN),
            status,
            is_deleted: take_flag(&mut record, fields::IS_DELETED),
            deleted_at: take_date(&mut record, fields::DELETED_AT),
            created_at,
            updated_at,
            cancelled_at: take_date(&mut record, fields::CANCELLED_AT),
            cancellation_reason: take_string(&mut record, fields::CANCELLATION_REASON),
            is_locked: take_flag(&mut record, fields::IS_LOCKED),
            is_archived: take_flag(&mut record, fields::IS_ARCHIVED),
            fields: record,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

fn take_string(record: &mut Record, field: &str) -> Option<String> {
    match record.remove(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn take_date(record: &mut Record, field: &str) -> Option<DateTime<Utc>> {
    record.remove(field).and_then(|v| v.as_date())
}

fn take_flag(record: &mut Record, field: &str) -> bool {
    record
        .remove(field)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}
