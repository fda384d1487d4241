//! Testing utilities and mock implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit and integration tests.

#![allow(dead_code)]

use crate::error::{Error, Result};
use crate::storage::{append_to, apply_query, merge_into};
use crate::traits::{Clock, Document, DocumentStore, Query, StoredDocument, WriteMode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// How reads should fail, when injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    /// A one-off failure such as a timeout.
    Transient,
    /// The store is unreachable.
    Offline,
}

/// An in-memory document store with fault injection.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RefCell<BTreeMap<(String, String), Document>>,
    missing_index: bool,
    writes: Cell<usize>,
    writes_allowed: Cell<Option<usize>>,
    read_failure: Cell<Option<ReadFailure>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject queries that need a composite index, like a fresh hosted store.
    #[must_use]
    pub const fn with_missing_index(mut self) -> Self {
        self.missing_index = true;
        self
    }

    /// Let `n` more writes succeed, then fail every write.
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_allowed.set(Some(n));
    }

    /// Let every write succeed again.
    pub fn heal_writes(&self) {
        self.writes_allowed.set(None);
    }

    /// Make reads fail (or succeed again with `None`).
    pub fn set_read_failure(&self, failure: Option<ReadFailure>) {
        self.read_failure.set(failure);
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Raw access to a stored document.
    #[must_use]
    pub fn raw(&self, collection: &str, id: &str) -> Option<Document> {
        self.docs.borrow().get(&(collection.to_string(), id.to_string())).cloned()
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.docs.borrow().keys().filter(|(c, _)| c == collection).count()
    }

    fn check_read(&self) -> Result<()> {
        match self.read_failure.get() {
            None => Ok(()),
            Some(ReadFailure::Transient) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "read timed out",
            ))),
            Some(ReadFailure::Offline) => Err(Error::StoreUnavailable("store offline".into())),
        }
    }

    fn begin_write(&self) -> Result<()> {
        if self.read_failure.get() == Some(ReadFailure::Offline) {
            return Err(Error::StoreUnavailable("store offline".into()));
        }
        match self.writes_allowed.get() {
            Some(0) => Err(Error::StoreUnavailable("write rejected".into())),
            Some(n) => {
                self.writes_allowed.set(Some(n - 1));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn finish_write(&self) {
        self.writes.set(self.writes.get() + 1);
    }

    fn key(collection: &str, id: &str) -> (String, String) {
        (collection.to_string(), id.to_string())
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_read()?;
        Ok(self.docs.borrow().get(&Self::key(collection, id)).cloned())
    }

    fn set(&self, collection: &str, id: &str, data: Document, mode: WriteMode) -> Result<()> {
        self.begin_write()?;
        let mut docs = self.docs.borrow_mut();
        let entry = docs.entry(Self::key(collection, id)).or_default();
        match mode {
            WriteMode::Replace => *entry = data,
            WriteMode::Merge => merge_into(entry, data),
        }
        drop(docs);
        self.finish_write();
        Ok(())
    }

    fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool> {
        self.begin_write()?;
        let mut docs = self.docs.borrow_mut();
        let Some(existing) = docs.get_mut(&Self::key(collection, id)) else {
            return Ok(false);
        };
        merge_into(existing, fields);
        drop(docs);
        self.finish_write();
        Ok(true)
    }

    fn append(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<bool> {
        self.begin_write()?;
        let mut docs = self.docs.borrow_mut();
        let Some(existing) = docs.get_mut(&Self::key(collection, id)) else {
            return Ok(false);
        };
        append_to(existing, field, value);
        drop(docs);
        self.finish_write();
        Ok(true)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        self.begin_write()?;
        let removed = self.docs.borrow_mut().remove(&Self::key(collection, id)).is_some();
        if removed {
            self.finish_write();
        }
        Ok(removed)
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>> {
        self.check_read()?;
        if self.missing_index && query.needs_composite_index() {
            return Err(Error::IndexNotReady(format!("{collection} composite index is building")));
        }
        let docs: Vec<StoredDocument> = self
            .docs
            .borrow()
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, id), data)| StoredDocument { id: id.clone(), data: data.clone() })
            .collect();
        Ok(apply_query(docs, query))
    }
}

/// A clock stuck at one instant, movable by tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    /// A clock at the given instant.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self { now: Cell::new(now) }
    }

    /// A clock at 2026-04-18 13:05 UTC (06:05 AM in US/Pacific).
    ///
    /// # Panics
    ///
    /// Never; the instant is a valid constant.
    #[must_use]
    pub fn race_morning() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 4, 18, 13, 5, 0).single().expect("valid instant"))
    }

    /// Move the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl Clock for std::rc::Rc<FixedClock> {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}
