//! `SQLite`-backed document store.
//!
//! Documents are stored as JSON text in a single table keyed by
//! `(collection, id)`. Filtering and ordering happen after load, which is
//! fine for a board of a few hundred records.

use crate::error::{Error, Result};
use crate::paths;
use crate::traits::{Document, DocumentStore, Query, StoredDocument, WriteMode};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// SQLite-based document store.
///
/// Each operation opens a new connection to the database file, so every call
/// behaves like an independent round trip to a hosted store. Read-modify-write
/// calls take the write lock up front, so concurrent writers queue on the
/// busy timeout and the last one to commit wins.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    /// Path to the database file.
    db_path: PathBuf,
}

impl SqliteDocumentStore {
    /// Open the store for the current directory's event, under `~/.race-checklist/events/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown or the database
    /// cannot be initialized.
    pub fn open_default() -> Result<Self> {
        let db_path = paths::default_db_path()
            .ok_or_else(|| Error::StoreUnavailable("cannot determine home directory".into()))?;
        Self::with_path(db_path)
    }

    /// Create a store with a specific database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn with_path(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self { db_path: db_path.as_ref().to_path_buf() };
        store.init_schema()?;
        Ok(store)
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection to the database.
    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Ok(conn)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (collection, id)
            );
            ",
        )?;

        Ok(())
    }

    fn load(conn: &Connection, collection: &str, id: &str) -> Result<Option<Document>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|text| serde_json::from_str(&text).map_err(Error::from)).transpose()
    }

    fn store(conn: &Connection, collection: &str, id: &str, data: &Document) -> Result<()> {
        let text = serde_json::to_string(data)?;
        conn.execute(
            "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, id)
             DO UPDATE SET data = excluded.data, updated_at = datetime('now')",
            params![collection, id, text],
        )?;
        Ok(())
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let conn = self.open()?;
        Self::load(&conn, collection, id)
    }

    fn set(&self, collection: &str, id: &str, data: Document, mode: WriteMode) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let doc = match mode {
            WriteMode::Replace => data,
            WriteMode::Merge => {
                let mut existing = Self::load(&tx, collection, id)?.unwrap_or_default();
                merge_into(&mut existing, data);
                existing
            }
        };
        Self::store(&tx, collection, id, &doc)?;
        tx.commit()?;
        Ok(())
    }

    fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool> {
        let mut conn = self.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(mut existing) = Self::load(&tx, collection, id)? else {
            return Ok(false);
        };
        merge_into(&mut existing, fields);
        Self::store(&tx, collection, id, &existing)?;
        tx.commit()?;
        Ok(true)
    }

    fn append(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<bool> {
        let mut conn = self.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(mut existing) = Self::load(&tx, collection, id)? else {
            return Ok(false);
        };
        append_to(&mut existing, field, value);
        Self::store(&tx, collection, id, &existing)?;
        tx.commit()?;
        Ok(true)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let conn = self.open()?;
        let rows = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(rows > 0)
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT id, data FROM documents WHERE collection = ?1")?;
        let rows: Vec<(String, String)> = stmt
            .query_map(params![collection], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut docs = Vec::with_capacity(rows.len());
        for (id, text) in rows {
            let data: Document = serde_json::from_str(&text)?;
            docs.push(StoredDocument { id, data });
        }
        Ok(apply_query(docs, query))
    }
}

/// Copy every field of `fields` onto `target`.
pub(crate) fn merge_into(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

/// Push `value` onto the array at `field`, creating it if missing.
pub(crate) fn append_to(target: &mut Document, field: &str, value: Value) {
    match target.get_mut(field) {
        Some(Value::Array(items)) => items.push(value),
        _ => {
            target.insert(field.to_string(), Value::Array(vec![value]));
        }
    }
}

/// Filter and sort documents the way the hosted store would.
pub(crate) fn apply_query(docs: Vec<StoredDocument>, query: &Query) -> Vec<StoredDocument> {
    let mut docs: Vec<StoredDocument> = match &query.field_eq {
        Some((field, value)) => {
            docs.into_iter().filter(|d| d.data.get(field) == Some(value)).collect()
        }
        None => docs,
    };
    match &query.order_by {
        Some(field) => {
            docs.sort_by(|a, b| {
                compare_values(a.data.get(field), b.data.get(field)).then_with(|| a.id.cmp(&b.id))
            });
        }
        None => docs.sort_by(|a, b| a.id.cmp(&b.id)),
    }
    docs
}

/// Order JSON values: missing first, then numbers, then strings, then the rest.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteDocumentStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteDocumentStore::with_path(dir.path().join("board.sqlite3")).unwrap();
        (dir, store)
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_store_creates_database() {
        let (_dir, store) = create_test_store();
        assert!(store.db_path().exists());
    }

    #[test]
    fn test_get_missing_document() {
        let (_dir, store) = create_test_store();
        assert!(store.get("settings", "categories").unwrap().is_none());
    }

    #[test]
    fn test_set_replace_overwrites_fields() {
        let (_dir, store) = create_test_store();
        store.set("settings", "x", doc(json!({"a": 1, "b": 2})), WriteMode::Replace).unwrap();
        store.set("settings", "x", doc(json!({"a": 3})), WriteMode::Replace).unwrap();

        let got = store.get("settings", "x").unwrap().unwrap();
        assert_eq!(got, doc(json!({"a": 3})));
    }

    #[test]
    fn test_set_merge_keeps_other_fields() {
        let (_dir, store) = create_test_store();
        store
            .set("settings", "s", doc(json!({"completed": false, "note": "late"})), WriteMode::Merge)
            .unwrap();
        store.set("settings", "s", doc(json!({"completed": true})), WriteMode::Merge).unwrap();

        let got = store.get("settings", "s").unwrap().unwrap();
        assert_eq!(got, doc(json!({"completed": true, "note": "late"})));
    }

    #[test]
    fn test_update_missing_returns_false() {
        let (_dir, store) = create_test_store();
        assert!(!store.update("race_tasks", "nope", doc(json!({"x": 1}))).unwrap());
        assert!(store.get("race_tasks", "nope").unwrap().is_none());
    }

    #[test]
    fn test_append_grows_array() {
        let (_dir, store) = create_test_store();
        store.set("race_tasks", "t", doc(json!({"title": "Cones"})), WriteMode::Replace).unwrap();

        assert!(store.append("race_tasks", "t", "history", json!("one")).unwrap());
        assert!(store.append("race_tasks", "t", "history", json!("two")).unwrap());

        let got = store.get("race_tasks", "t").unwrap().unwrap();
        assert_eq!(got["history"], json!(["one", "two"]));
        assert!(!store.append("race_tasks", "missing", "history", json!("x")).unwrap());
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = create_test_store();
        store.set("race_tasks", "t", doc(json!({})), WriteMode::Replace).unwrap();
        assert!(store.delete("race_tasks", "t").unwrap());
        assert!(!store.delete("race_tasks", "t").unwrap());
    }

    #[test]
    fn test_concurrent_writers_all_land() {
        let (dir, store) = create_test_store();
        let path = dir.path().join("board.sqlite3");
        store
            .set("race_tasks", "ice", doc(json!({"title": "Ice", "notes": ""})), WriteMode::Replace)
            .unwrap();

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = SqliteDocumentStore::with_path(&path).unwrap();
                    let mut failures = Vec::new();
                    for round in 0..20 {
                        let note = format!("worker {worker} round {round}");
                        if let Err(e) =
                            store.update("race_tasks", "ice", doc(json!({ "notes": note })))
                        {
                            failures.push(e.to_string());
                        }
                        let status = doc(json!({ "completed": round % 2 == 0, "note": note }));
                        if let Err(e) =
                            store.set("settings", "status_Vendors", status, WriteMode::Merge)
                        {
                            failures.push(e.to_string());
                        }
                    }
                    failures
                })
            })
            .collect();

        let failures: Vec<String> =
            workers.into_iter().flat_map(|w| w.join().unwrap()).collect();
        assert!(failures.is_empty(), "{} writes failed: {:?}", failures.len(), failures.first());

        let task = store.get("race_tasks", "ice").unwrap().unwrap();
        assert_eq!(task["title"], "Ice");
        assert!(task["notes"].as_str().unwrap().starts_with("worker "));
        let status = store.get("settings", "status_Vendors").unwrap().unwrap();
        assert_eq!(status["completed"], json!(false));
    }

    #[test]
    fn test_query_filters_and_orders() {
        let (_dir, store) = create_test_store();
        for (id, cat, order) in [("a", "Vendors", 2), ("b", "Vendors", 0), ("c", "Finish Line", 1)] {
            store
                .set(
                    "race_tasks",
                    id,
                    doc(json!({"category": cat, "sort_order": order})),
                    WriteMode::Replace,
                )
                .unwrap();
        }

        let got = store
            .query("race_tasks", &Query::where_eq("category", "Vendors").order_by("sort_order"))
            .unwrap();
        let ids: Vec<_> = got.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_query_is_scoped_to_collection() {
        let (_dir, store) = create_test_store();
        store.set("settings", "a", doc(json!({})), WriteMode::Replace).unwrap();
        store.set("race_tasks", "b", doc(json!({})), WriteMode::Replace).unwrap();

        let got = store.query("race_tasks", &Query::all()).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "b");
    }

    #[test]
    fn test_compare_values_numbers_before_strings() {
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!(2))), Ordering::Less);
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(5)), Some(&json!("a"))), Ordering::Less);
    }

    #[test]
    fn test_open_fails_when_path_is_directory() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("board.sqlite3");
        std::fs::create_dir_all(&db_path).unwrap();

        let result = SqliteDocumentStore::with_path(&db_path);
        assert!(result.is_err());
    }
}
