//! Task repository over the `race_tasks` collection.
//!
//! Tasks refer to their category by name. Everything that depends on that
//! denormalized key (filtering by category, spotting orphans) lives here.

use crate::checklist::models::{Category, Task};
use crate::checklist::TASKS_COLLECTION;
use crate::error::{Error, Result};
use crate::traits::{Document, DocumentStore, Query, WriteMode};
use serde_json::Value;
use std::collections::HashSet;

/// Read and write access to stored tasks.
#[derive(Debug)]
pub struct TaskRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> TaskRepository<'a, S> {
    /// Wrap a document store.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Fetch one task by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails or the document is malformed.
    pub fn get(&self, id: &str) -> Result<Option<Task>> {
        self.store
            .get(TASKS_COLLECTION, id)?
            .map(|data| Task::from_document(id, data))
            .transpose()
    }

    /// Tasks in a category, sorted by `sort_order`.
    ///
    /// This filters on `category` and sorts on `sort_order`, which hosted
    /// stores serve from a composite index; a missing index surfaces as
    /// [`crate::error::Error::IndexNotReady`].
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn tasks_by_category(&self, category: &str) -> Result<Vec<Task>> {
        let query = Query::where_eq("category", category).order_by("sort_order");
        self.collect(&query)
    }

    /// Tasks in a category in store order. Needs no composite index.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn tasks_in_category_unordered(&self, category: &str) -> Result<Vec<Task>> {
        self.collect(&Query::where_eq("category", category))
    }

    /// Every stored task.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all(&self) -> Result<Vec<Task>> {
        self.collect(&Query::all())
    }

    /// Tasks whose category is not in `categories`, sorted by category then order.
    ///
    /// These are left behind by `delete_category` and by a rename that
    /// stopped before every task was retagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn orphaned(&self, categories: &[Category]) -> Result<Vec<Task>> {
        let known: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        let mut orphans: Vec<Task> =
            self.all()?.into_iter().filter(|t| !known.contains(t.category.as_str())).collect();
        orphans.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then(a.sort_order.cmp(&b.sort_order))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(orphans)
    }

    /// Next `sort_order` for a new task: one past the current maximum.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, or [`Error::InvalidInput`] if the
    /// current maximum is already `i64::MAX`.
    pub fn next_sort_order(&self, category: &str) -> Result<i64> {
        let max = self.tasks_in_category_unordered(category)?.iter().map(|t| t.sort_order).max();
        match max {
            None => Ok(0),
            Some(m) => m.checked_add(1).ok_or_else(|| {
                Error::InvalidInput(format!("sort order overflow in '{category}'"))
            }),
        }
    }

    /// Whether a task id is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.store.get(TASKS_COLLECTION, id)?.is_some())
    }

    /// Write a whole task.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert(&self, task: &Task) -> Result<()> {
        self.store.set(TASKS_COLLECTION, &task.id, task.to_document()?, WriteMode::Replace)
    }

    /// Merge fields into a task. Returns `false` if the task is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn update_fields(&self, id: &str, fields: Document) -> Result<bool> {
        self.store.update(TASKS_COLLECTION, id, fields)
    }

    /// Append one line to a task's history. Returns `false` if the task is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn append_history(&self, id: &str, line: &str) -> Result<bool> {
        self.store.append(TASKS_COLLECTION, id, "history", Value::from(line))
    }

    /// Delete a task. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(TASKS_COLLECTION, id)
    }

    /// Malformed documents are skipped so one bad record cannot hide the rest.
    fn collect(&self, query: &Query) -> Result<Vec<Task>> {
        let docs = self.store.query(TASKS_COLLECTION, query)?;
        let mut tasks = Vec::with_capacity(docs.len());
        for doc in docs {
            match Task::from_document(&doc.id, doc.data) {
                Ok(task) => tasks.push(task),
                Err(e) => tracing::warn!(task_id = %doc.id, error = %e, "skipping malformed task"),
            }
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryDocumentStore;

    fn task(id: &str, category: &str, sort_order: i64) -> Task {
        Task {
            id: id.to_string(),
            category: category.to_string(),
            title: id.to_uppercase(),
            sort_order,
            ..Default::default()
        }
    }

    #[test]
    fn test_tasks_by_category_sorted() {
        let store = MemoryDocumentStore::new();
        let repo = TaskRepository::new(&store);
        repo.insert(&task("c", "Vendors", 2)).unwrap();
        repo.insert(&task("a", "Vendors", 0)).unwrap();
        repo.insert(&task("x", "Finish Line", 1)).unwrap();

        let ids: Vec<_> =
            repo.tasks_by_category("Vendors").unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_orphaned_tasks() {
        let store = MemoryDocumentStore::new();
        let repo = TaskRepository::new(&store);
        repo.insert(&task("a", "Vendors", 0)).unwrap();
        repo.insert(&task("b", "Gone", 0)).unwrap();

        let orphans = repo.orphaned(&[Category::new("Vendors", 0)]).unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, "b");
    }

    #[test]
    fn test_next_sort_order_is_max_plus_one() {
        let store = MemoryDocumentStore::new();
        let repo = TaskRepository::new(&store);
        assert_eq!(repo.next_sort_order("Vendors").unwrap(), 0);

        repo.insert(&task("a", "Vendors", 0)).unwrap();
        repo.insert(&task("c", "Vendors", 2)).unwrap();
        assert_eq!(repo.next_sort_order("Vendors").unwrap(), 3);
    }

    #[test]
    fn test_next_sort_order_rejects_overflow() {
        let store = MemoryDocumentStore::new();
        let repo = TaskRepository::new(&store);
        repo.insert(&task("a", "Vendors", i64::MAX)).unwrap();

        let err = repo.next_sort_order("Vendors").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_malformed_task_is_skipped_in_listings() {
        let store = MemoryDocumentStore::new();
        let repo = TaskRepository::new(&store);
        repo.insert(&task("a", "Vendors", 0)).unwrap();
        let mut bad = Document::new();
        bad.insert("category".to_string(), Value::from("Vendors"));
        bad.insert("title".to_string(), Value::from(42));
        bad.insert("sort_order".to_string(), Value::from(1));
        store.set(TASKS_COLLECTION, "bad", bad, WriteMode::Replace).unwrap();

        let ids: Vec<_> =
            repo.tasks_by_category("Vendors").unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a"]);
        assert!(repo.get("bad").is_err());
    }

    #[test]
    fn test_unordered_query_works_without_index() {
        let store = MemoryDocumentStore::new().with_missing_index();
        let repo = TaskRepository::new(&store);
        repo.insert(&task("a", "Vendors", 0)).unwrap();

        assert!(repo.tasks_by_category("Vendors").unwrap_err().is_retryable());
        assert_eq!(repo.tasks_in_category_unordered("Vendors").unwrap().len(), 1);
    }

    #[test]
    fn test_get_update_append_delete() {
        let store = MemoryDocumentStore::new();
        let repo = TaskRepository::new(&store);
        repo.insert(&task("a", "Vendors", 0)).unwrap();

        let mut fields = Document::new();
        fields.insert("notes".to_string(), Value::from("call supplier"));
        assert!(repo.update_fields("a", fields).unwrap());
        assert!(repo.append_history("a", "line").unwrap());

        let got = repo.get("a").unwrap().unwrap();
        assert_eq!(got.notes, "call supplier");
        assert_eq!(got.history, vec!["line"]);

        assert!(repo.delete("a").unwrap());
        assert!(repo.get("a").unwrap().is_none());
        assert!(!repo.exists("a").unwrap());
    }
}
