//! Core traits for testability and abstraction.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// The field map of one stored document.
pub type Document = Map<String, Value>;

/// A document together with its key inside a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Key of the document within its collection.
    pub id: String,
    /// The document's fields.
    pub data: Document,
}

/// How `set` treats fields already on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the whole document.
    Replace,
    /// Update only the supplied fields, creating the document if needed.
    Merge,
}

/// An equality filter plus an optional ascending sort field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Keep only documents whose field equals the value.
    pub field_eq: Option<(String, Value)>,
    /// Sort ascending by this field.
    pub order_by: Option<String>,
}

impl Query {
    /// A query matching every document in the collection.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A query matching documents where `field == value`.
    #[must_use]
    pub fn where_eq(field: &str, value: impl Into<Value>) -> Self {
        Self { field_eq: Some((field.to_string(), value.into())), order_by: None }
    }

    /// Sort the results ascending by `field`.
    #[must_use]
    pub fn order_by(mut self, field: &str) -> Self {
        self.order_by = Some(field.to_string());
        self
    }

    /// Whether this query filters and sorts on different fields, which
    /// hosted stores serve from a composite index.
    #[must_use]
    pub fn needs_composite_index(&self) -> bool {
        match (&self.field_eq, &self.order_by) {
            (Some((field, _)), Some(order)) => field != order,
            _ => false,
        }
    }
}

/// Trait for the external document store.
///
/// Every call is one round trip. Each single-document write is atomic for
/// that document; nothing spans documents.
pub trait DocumentStore {
    /// Fetch a document, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Write a document, replacing or merging per `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set(&self, collection: &str, id: &str, data: Document, mode: WriteMode) -> Result<()>;

    /// Update fields on an existing document. Returns `false` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool>;

    /// Append a value to an array field on an existing document.
    /// Returns `false` if the document is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<bool>;

    /// Delete a document. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Run an equality/order query over a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, including
    /// [`crate::error::Error::IndexNotReady`] when the store is still building
    /// the index the query needs.
    fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        (**self).get(collection, id)
    }

    fn set(&self, collection: &str, id: &str, data: Document, mode: WriteMode) -> Result<()> {
        (**self).set(collection, id, data, mode)
    }

    fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool> {
        (**self).update(collection, id, fields)
    }

    fn append(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<bool> {
        (**self).append(collection, id, field, value)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        (**self).delete(collection, id)
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>> {
        (**self).query(collection, query)
    }
}

/// Trait for reading the current time.
///
/// This trait abstracts the wall clock for testability.
pub trait Clock {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
