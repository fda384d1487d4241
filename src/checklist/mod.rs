//! Race-day checklist state.
//!
//! This module provides the category/task model behind the status board:
//! - Categories with an explicit, always-renumbered display order
//! - A GO / NO GO status per category, merge-written so status and note
//!   edits never clobber each other
//! - Tasks ordered within their category, with a one-way completion lock
//!   for viewers
//! - Two-phase plans for the writes that span several documents
//!
//! # Example
//!
//! ```no_run
//! use race_checklist::checklist::{Actor, ChecklistManager, Direction};
//! use race_checklist::storage::SqliteDocumentStore;
//!
//! let store = SqliteDocumentStore::with_path("/tmp/board.sqlite3").unwrap();
//! let board = ChecklistManager::new(store, chrono_tz::US::Pacific);
//! let admin = Actor::admin();
//!
//! let banner = board.add_task(&admin, "Finish Line", "Hang banner").unwrap();
//! board.set_task_completion(&Actor::viewer(), &banner.id, true).unwrap();
//! board.move_task(&admin, &banner.id, "Finish Line", banner.sort_order, Direction::Up).unwrap();
//! ```

pub mod id;
pub mod manager;
pub mod models;
pub mod plan;
pub mod repository;

pub use manager::{ChecklistManager, RenameReport};
pub use models::{
    Actor, Category, CategoryStatus, CompletionState, Direction, Role, StatusUpdate, Task,
};
pub use plan::{Intent, MutationPlan, Step};
pub use repository::TaskRepository;

use crate::traits::Document;
use serde_json::Value;

/// Collection holding the category list and per-category status documents.
pub const SETTINGS_COLLECTION: &str = "settings";

/// Key of the singleton category list document.
pub const CATEGORIES_DOC: &str = "categories";

/// Collection holding tasks.
pub const TASKS_COLLECTION: &str = "race_tasks";

/// Categories used when no category list has ever been saved.
pub const DEFAULT_CATEGORIES: [&str; 4] =
    ["Transportation", "Course & Traffic", "Vendors", "Finish Line"];

/// The built-in category list with orders 0..3.
#[must_use]
pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES.iter().zip(0..).map(|(name, order)| Category::new(*name, order)).collect()
}

/// Rewrite each category's `order` to its position in the list.
pub fn renumber_categories(categories: &mut [Category]) {
    for (category, order) in categories.iter_mut().zip(0..) {
        category.order = order;
    }
}

/// The stored form of a category list.
#[must_use]
pub fn categories_document(categories: &[Category]) -> Document {
    let list: Vec<Value> = categories
        .iter()
        .map(|c| serde_json::json!({"name": c.name, "order": c.order}))
        .collect();
    let mut doc = Document::new();
    doc.insert("list".to_string(), Value::Array(list));
    doc
}

/// Parse a stored category list, sorted by `order`.
///
/// Accepts the `list` key and the older `data` key. Entries may be
/// `{name, order}` objects, objects without `order` (position is used), or
/// bare names. Entries without a usable name are skipped.
#[must_use]
pub fn parse_categories(doc: &Document) -> Vec<Category> {
    let Some(Value::Array(entries)) = doc.get("list").or_else(|| doc.get("data")) else {
        return Vec::new();
    };

    let mut categories: Vec<Category> = entries
        .iter()
        .zip(0..)
        .filter_map(|(entry, position)| match entry {
            Value::String(name) => Some(Category::new(name.as_str(), position)),
            Value::Object(fields) => {
                let name = fields.get("name")?.as_str()?;
                let order = fields.get("order").and_then(Value::as_i64).unwrap_or(position);
                Some(Category::new(name, order))
            }
            _ => None,
        })
        .filter(|c| !c.name.trim().is_empty())
        .collect();
    categories.sort_by_key(|c| c.order);
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_default_categories() {
        let defaults = default_categories();
        let names: Vec<_> = defaults.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, DEFAULT_CATEGORIES);
        let orders: Vec<_> = defaults.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_sorts_by_order() {
        let parsed = parse_categories(&doc(json!({
            "list": [{"name": "B", "order": 1}, {"name": "A", "order": 0}]
        })));
        assert_eq!(parsed, vec![Category::new("A", 0), Category::new("B", 1)]);
    }

    #[test]
    fn test_parse_legacy_layouts() {
        let parsed = parse_categories(&doc(json!({"data": ["Vendors", {"name": "Finish Line"}]})));
        assert_eq!(parsed, vec![Category::new("Vendors", 0), Category::new("Finish Line", 1)]);
    }

    #[test]
    fn test_parse_skips_unusable_entries() {
        let parsed = parse_categories(&doc(json!({"list": [{"order": 0}, "", 7, "Vendors"]})));
        assert_eq!(parsed, vec![Category::new("Vendors", 3)]);
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_categories(&Document::new()).is_empty());
    }

    #[test]
    fn test_categories_document_round_trip() {
        let categories = default_categories();
        assert_eq!(parse_categories(&categories_document(&categories)), categories);
    }

    #[test]
    fn test_renumber_categories() {
        let mut categories = vec![Category::new("A", 7), Category::new("B", 7)];
        renumber_categories(&mut categories);
        assert_eq!(categories[0].order, 0);
        assert_eq!(categories[1].order, 1);
    }
}
