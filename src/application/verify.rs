use crate::domain::codec::to_native;
use crate::domain::{fields, DocumentConfig, DocumentStatus, DocumentType, Record, Value};
use crate::infrastructure::collection::ActiveCollection;
use crate::infrastructure::database::{DocumentStore, Query, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Document type and verification token are required")]
    InvalidRequest,

    #[error("Unknown document type: {0}")]
    InvalidDocType(String),

    #[error("No document carries this verification token")]
    NotFound,

    #[error("Database error: {0}")]
    Persistence(#[from] StoreError),
}

impl VerifyError {
    /// The only failure text shown to whoever scanned the code.
    pub const PUBLIC_MESSAGE: &'static str = "Document not found or cannot be verified";
}

/// Public view of a verified document. Owner and payload stay private.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub document_type: String,
    pub document_number: String,
    pub document_date: Option<DateTime<Utc>>,
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    pub status: DocumentStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl VerificationResult {
    fn project(config: &DocumentConfig, record: &Record) -> Self {
        let text = |field: &str| {
            record
                .get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let status: DocumentStatus = record
            .get(fields::DOCUMENT_STATUS)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let cancelled_at = match status {
            DocumentStatus::Cancelled => record.get(fields::CANCELLED_AT).and_then(Value::as_date),
            DocumentStatus::Active => None,
        };

        Self {
            document_type: config.doc_type.display_name().to_string(),
            document_number: record
                .get(config.document_number_field)
                .and_then(Value::to_identifier)
                .unwrap_or_default(),
            document_date: record.get(config.document_date_field).and_then(Value::as_date),
            company_name: text(config.company_name_field),
            customer_name: config.customer_name_field.and_then(text),
            total_amount: config
                .total_amount_field
                .and_then(|field| record.get(field))
                .and_then(Value::as_f64),
            status,
            cancelled_at,
        }
    }
}

/// Owner-agnostic lookup of documents by their verification token.
pub struct VerificationResolver<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> VerificationResolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn lookup(&self, doc_type: &str, token: &str) -> Result<VerificationResult, VerifyError> {
        let (doc_type, token) = (doc_type.trim(), token.trim());
        if doc_type.is_empty() || token.is_empty() {
            return Err(VerifyError::InvalidRequest);
        }

        let config = DocumentType::from_collection(doc_type)
            .ok_or_else(|| VerifyError::InvalidDocType(doc_type.to_string()))?
            .config();

        let docs = ActiveCollection::new(self.store, config.collection);
        let matches = docs.find(
            Query::new()
                .where_eq(fields::VERIFICATION_TOKEN, token)
                .limit(1),
        )?;

        let (id, record) = matches.into_iter().next().ok_or(VerifyError::NotFound)?;
        tracing::info!(collection = config.collection, %id, "document verified");

        let record = to_native(&record, config.date_fields);
        Ok(VerificationResult::project(config, &record))
    }
}
