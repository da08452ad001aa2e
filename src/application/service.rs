use super::error::DocumentError;
use crate::domain::codec::{strip_undefined, to_native, to_storage};
use crate::domain::{fields, token, Document, DocumentConfig, DocumentStatus, Record, Session, Timestamp, Value};
use crate::infrastructure::collection::ActiveCollection;
use crate::infrastructure::database::{Direction, DocumentStore, Query, StoreError};
use chrono::Utc;

pub const DEFAULT_LIST_LIMIT: usize = 50;

/// CRUD over one document type, driven entirely by its [`DocumentConfig`].
pub struct DocumentService<'s, S: DocumentStore + ?Sized> {
    docs: ActiveCollection<'s, S>,
    config: &'static DocumentConfig,
}

impl<'s, S: DocumentStore + ?Sized> DocumentService<'s, S> {
    pub fn new(store: &'s S, config: &'static DocumentConfig) -> Self {
        Self {
            docs: ActiveCollection::new(store, config.collection),
            config,
        }
    }

    pub fn config(&self) -> &'static DocumentConfig {
        self.config
    }

    /// Create (or overwrite) the document derived from `data` and return its ID.
    pub fn save(
        &self,
        session: &Session,
        data: &Record,
        organization_id: Option<&str>,
    ) -> Result<String, DocumentError> {
        let user_id = require_user(session)?;

        let number_field = self.config.document_number_field;
        let document_number = data
            .get(number_field)
            .and_then(Value::to_identifier)
            .ok_or_else(|| {
                DocumentError::InvalidRequest(format!("'{}' is required", number_field))
            })?;

        let now = Utc::now();
        let id = self.config.document_id(&document_number, now.date_naive());

        let token = match data.get(fields::VERIFICATION_TOKEN) {
            Some(Value::String(existing)) if !existing.is_empty() => existing.clone(),
            _ => token::generate(),
        };

        // Number stored in the normalized text form the ID is built from.
        let mut record = data.clone();
        record.insert(number_field.into(), document_number.into());
        self.apply_logo_rule(&mut record);

        let status = record
            .get(fields::DOCUMENT_STATUS)
            .and_then(Value::as_str)
            .map(parse_status)
            .transpose()?
            .unwrap_or_default();

        let stamp = Value::Timestamp(Timestamp::from_datetime(&now));
        record.insert(fields::USER_ID.into(), user_id.into());
        record.insert(fields::ORGANIZATION_ID.into(), organization_id.into());
        record.insert(fields::VERIFICATION_TOKEN.into(), token.into());
        record.insert(fields::DOCUMENT_STATUS.into(), status.as_str().into());
        record.insert(fields::IS_DELETED.into(), false.into());
        record.insert(fields::CREATED_AT.into(), stamp.clone());
        record.insert(fields::UPDATED_AT.into(), stamp);

        let record = strip_undefined(&to_storage(&record, self.config.date_fields));

        self.docs
            .write(&id, &record)
            .map_err(|e| self.persistence(self.config.messages.save, &id, e))?;

        tracing::info!(collection = self.config.collection, %id, "document saved");
        Ok(id)
    }

    /// Live document by ID; `None` when absent or soft-deleted.
    pub fn get(&self, id: &str) -> Result<Option<Document>, DocumentError> {
        let message = self.config.messages.get;
        let record = self
            .docs
            .get(id)
            .map_err(|e| self.persistence(message, id, e))?;

        tracing::debug!(collection = self.config.collection, %id, found = record.is_some(), "document read");
        record
            .map(|record| self.to_document(id, record, message))
            .transpose()
    }

    /// The caller's newest documents first, at most `limit` of them.
    pub fn get_all(
        &self,
        session: &Session,
        limit: usize,
        organization_id: Option<&str>,
    ) -> Result<Vec<Document>, DocumentError> {
        let user_id = require_user(session)?;

        let mut query = Query::new().where_eq(fields::USER_ID, user_id);
        if let Some(org) = organization_id {
            query = query.where_eq(fields::ORGANIZATION_ID, org);
        }
        let query = query
            .order_by(fields::CREATED_AT, Direction::Descending)
            .limit(limit);

        self.run_query(query, self.config.messages.get_all)
    }

    /// Patch a document the caller may modify.
    pub fn update(&self, session: &Session, id: &str, patch: &Record) -> Result<(), DocumentError> {
        let message = self.config.messages.update;
        let existing = self.load_for_write(session, id, message)?;

        if let Some(requested) = patch.get(fields::DOCUMENT_STATUS).and_then(Value::as_str) {
            let requested = parse_status(requested)?;
            let current = existing
                .get(fields::DOCUMENT_STATUS)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<DocumentStatus>().ok())
                .unwrap_or_default();
            if current == DocumentStatus::Cancelled && requested == DocumentStatus::Active {
                return Err(DocumentError::InvalidStatusTransition {
                    id: id.to_string(),
                    from: current.as_str(),
                    to: requested.as_str(),
                });
            }
        }

        let ignored: Vec<&str> = fields::PROTECTED
            .into_iter()
            .filter(|field| patch.contains_key(*field))
            .collect();
        if !ignored.is_empty() {
            tracing::warn!(collection = self.config.collection, %id, ?ignored, "protected fields dropped from patch");
        }

        let mut patch = to_storage(patch, self.config.date_fields);
        for field in fields::PROTECTED {
            patch.remove(field);
        }
        patch.insert(fields::UPDATED_AT.into(), Value::Timestamp(Timestamp::now()));
        self.apply_logo_rule(&mut patch);
        let patch = strip_undefined(&patch);

        self.docs
            .merge(id, &patch)
            .map_err(|e| self.persistence(message, id, e))?;

        tracing::info!(collection = self.config.collection, %id, fields = patch.len(), "document updated");
        Ok(())
    }

    /// Soft delete: the record stays in the store flagged as deleted.
    pub fn delete(&self, session: &Session, id: &str) -> Result<(), DocumentError> {
        let message = self.config.messages.delete;
        self.load_for_write(session, id, message)?;

        let now = Value::Timestamp(Timestamp::now());
        let mut patch = Record::new();
        patch.insert(fields::IS_DELETED.into(), true.into());
        patch.insert(fields::DELETED_AT.into(), now.clone());
        patch.insert(fields::UPDATED_AT.into(), now);

        self.docs
            .merge(id, &patch)
            .map_err(|e| self.persistence(message, id, e))?;

        tracing::info!(collection = self.config.collection, %id, "document deleted");
        Ok(())
    }

    pub fn search_by_document_number(
        &self,
        session: &Session,
        document_number: &str,
        organization_id: Option<&str>,
    ) -> Result<Vec<Document>, DocumentError> {
        let user_id = require_user(session)?;

        let mut query = Query::new()
            .where_eq(self.config.document_number_field, document_number.trim())
            .where_eq(fields::USER_ID, user_id);
        if let Some(org) = organization_id {
            query = query.where_eq(fields::ORGANIZATION_ID, org);
        }

        self.run_query(query, self.config.messages.search)
    }

    /// Raw record including soft-deleted ones, for integrity audits.
    pub fn get_including_deleted(&self, id: &str) -> Result<Option<Record>, DocumentError> {
        let message = self.config.messages.get;
        let record = self
            .docs
            .get_including_deleted(id)
            .map_err(|e| self.persistence(message, id, e))?;
        Ok(record.map(|record| to_native(&record, self.config.date_fields)))
    }

    /// Loads a live document and checks the caller may write to it: owners
    /// always may, anyone signed in may touch documents without an organization.
    fn load_for_write(
        &self,
        session: &Session,
        id: &str,
        message: &'static str,
    ) -> Result<Record, DocumentError> {
        let user_id = require_user(session)?;

        let existing = self
            .docs
            .get(id)
            .map_err(|e| self.persistence(message, id, e))?
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))?;

        let is_owner = existing.get(fields::USER_ID).and_then(Value::as_str) == Some(user_id);
        let has_organization = matches!(
            existing.get(fields::ORGANIZATION_ID),
            Some(Value::String(org)) if !org.is_empty()
        );

        if !is_owner && has_organization {
            tracing::warn!(collection = self.config.collection, %id, user_id, "write refused for non-owner");
            return Err(DocumentError::Forbidden(id.to_string()));
        }
        Ok(existing)
    }

    fn run_query(&self, query: Query, message: &'static str) -> Result<Vec<Document>, DocumentError> {
        let rows = self
            .docs
            .find(query)
            .map_err(|e| self.persistence(message, self.config.collection, e))?;

        // Malformed rows are logged by to_document and skipped.
        let documents = rows
            .into_iter()
            .filter_map(|(id, record)| self.to_document(&id, record, message).ok())
            .collect();
        Ok(documents)
    }

    fn to_document(&self, id: &str, record: Record, message: &'static str) -> Result<Document, DocumentError> {
        let record = to_native(&record, self.config.date_fields);
        Document::from_record(id, record).map_err(|e| {
            let reason = e.to_string();
            self.persistence(message, id, StoreError::Corrupt { id: id.to_string(), reason })
        })
    }

    /// A hosted logo URL makes the inline logo payload redundant.
    fn apply_logo_rule(&self, record: &mut Record) {
        let Some(logo) = self.config.logo else {
            return;
        };
        let has_url = matches!(record.get(logo.url), Some(Value::String(url)) if !url.is_empty());
        if has_url {
            record.insert(logo.inline.to_string(), Value::Null);
        }
    }

    fn persistence(&self, message: &'static str, subject: &str, source: StoreError) -> DocumentError {
        tracing::error!(collection = self.config.collection, subject, error = %source, "{}", message);
        DocumentError::Persistence { message, source }
    }
}

pub(crate) fn require_user(session: &Session) -> Result<&str, DocumentError> {
    session.user_id().ok_or(DocumentError::Unauthenticated)
}

fn parse_status(value: &str) -> Result<DocumentStatus, DocumentError> {
    value
        .parse()
        .map_err(|e: crate::domain::document::UnknownStatus| DocumentError::InvalidRequest(e.to_string()))
}
