//! Document management operations built on the generic service primitives.

use super::error::DocumentError;
use super::service::{require_user, DocumentService};
use crate::domain::{fields, DocumentStatus, Record, Session, Value};
use crate::infrastructure::database::DocumentStore;
use chrono::Utc;

impl<'s, S: DocumentStore + ?Sized> DocumentService<'s, S> {
    pub fn lock(&self, session: &Session, id: &str) -> Result<(), DocumentError> {
        self.set_flag(session, id, fields::IS_LOCKED, true)
    }

    pub fn unlock(&self, session: &Session, id: &str) -> Result<(), DocumentError> {
        self.set_flag(session, id, fields::IS_LOCKED, false)
    }

    pub fn archive(&self, session: &Session, id: &str) -> Result<(), DocumentError> {
        self.set_flag(session, id, fields::IS_ARCHIVED, true)
    }

    pub fn unarchive(&self, session: &Session, id: &str) -> Result<(), DocumentError> {
        self.set_flag(session, id, fields::IS_ARCHIVED, false)
    }

    /// Mark a document cancelled. Cancellation is final.
    pub fn cancel(&self, session: &Session, id: &str, reason: Option<&str>) -> Result<(), DocumentError> {
        require_user(session)?;
        let current = self
            .get(id)?
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))?;

        if current.status == DocumentStatus::Cancelled {
            return Err(DocumentError::InvalidStatusTransition {
                id: id.to_string(),
                from: DocumentStatus::Cancelled.as_str(),
                to: DocumentStatus::Cancelled.as_str(),
            });
        }

        let mut patch = Record::new();
        patch.insert(fields::DOCUMENT_STATUS.into(), DocumentStatus::Cancelled.as_str().into());
        patch.insert(fields::CANCELLED_AT.into(), Value::Date(Utc::now()));
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            patch.insert(fields::CANCELLATION_REASON.into(), reason.trim().into());
        }
        self.update(session, id, &patch)
    }

    /// Save a fresh copy of a document under a new number.
    ///
    /// The copy gets a new verification token and starts out active, unlocked
    /// and unarchived. Without `new_number` the source number is reused, which
    /// is refused when it would land on the source's own ID.
    pub fn copy(
        &self,
        session: &Session,
        source_id: &str,
        new_number: Option<&str>,
        organization_id: Option<&str>,
    ) -> Result<String, DocumentError> {
        require_user(session)?;
        let source = self
            .get(source_id)?
            .ok_or_else(|| DocumentError::NotFound(source_id.to_string()))?;

        let config = self.config();
        let mut data = source.fields.clone();
        for field in fields::SYSTEM {
            data.remove(field);
        }
        if let Some(number) = new_number.map(str::trim).filter(|n| !n.is_empty()) {
            data.insert(config.document_number_field.into(), number.into());
        }

        let number = data
            .get(config.document_number_field)
            .and_then(Value::to_identifier)
            .unwrap_or_default();
        if config.document_id(&number, Utc::now().date_naive()) == source_id {
            return Err(DocumentError::InvalidRequest(format!(
                "copy of {} needs a new document number",
                source_id
            )));
        }

        let organization_id = organization_id.or(source.organization_id.as_deref());
        let id = self.save(session, &data, organization_id)?;
        tracing::info!(collection = config.collection, source = source_id, copy = %id, "document copied");
        Ok(id)
    }

    fn set_flag(&self, session: &Session, id: &str, flag: &str, value: bool) -> Result<(), DocumentError> {
        let mut patch = Record::new();
        patch.insert(flag.to_string(), value.into());
        self.update(session, id, &patch)
    }
}
