use super::database::{DocumentStore, Query, StoreError};
use crate::domain::{fields, Record, Value};

/// A collection view that hides soft-deleted documents.
///
/// All service reads go through this type so the `isDeleted` predicate is
/// applied in exactly one place.
pub struct ActiveCollection<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
    name: &'static str,
}

impl<'s, S: DocumentStore + ?Sized> ActiveCollection<'s, S> {
    pub fn new(store: &'s S, name: &'static str) -> Self {
        Self { store, name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self
            .store
            .fetch(self.name, id)?
            .filter(|record| !is_soft_deleted(record)))
    }

    /// Runs `query` restricted to live documents. Rows the store returns
    /// despite the filter are dropped here as well.
    pub fn find(&self, query: Query) -> Result<Vec<(String, Record)>, StoreError> {
        let query = query.where_eq(fields::IS_DELETED, false);
        Ok(self
            .store
            .query(self.name, &query)?
            .into_iter()
            .filter(|(_, record)| !is_soft_deleted(record))
            .collect())
    }

    /// Reads past the soft-delete filter, for integrity audits.
    pub fn get_including_deleted(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.store.fetch(self.name, id)
    }

    pub fn write(&self, id: &str, record: &Record) -> Result<(), StoreError> {
        self.store.set(self.name, id, record)
    }

    pub fn merge(&self, id: &str, patch: &Record) -> Result<(), StoreError> {
        self.store.merge(self.name, id, patch)
    }
}

pub fn is_soft_deleted(record: &Record) -> bool {
    matches!(record.get(fields::IS_DELETED), Some(Value::Bool(true)))
}
