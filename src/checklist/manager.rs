//! The checklist state manager.
//!
//! Every call is a fresh round trip to the document store; nothing is cached
//! between calls. Callers re-read after each mutation.

use crate::checklist::id::{generate_task_id, sanitize_key, status_key};
use crate::checklist::models::{
    Actor, Category, CategoryStatus, CompletionState, Direction, StatusUpdate, Task,
};
use crate::checklist::plan::{Intent, MutationPlan, Step};
use crate::checklist::repository::TaskRepository;
use crate::checklist::{
    categories_document, default_categories, parse_categories, renumber_categories,
    CATEGORIES_DOC, SETTINGS_COLLECTION,
};
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::traits::{Clock, Document, DocumentStore, SystemClock, WriteMode};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::HashSet;

/// How many fresh ids to try before giving up on a collision.
const MAX_ID_ATTEMPTS: usize = 8;

/// Outcome of a category rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameReport {
    /// The category after the rename.
    pub category: Category,
    /// Tasks moved over to the new name.
    pub retagged_tasks: usize,
}

/// Owns the category list, category status and tasks of one board.
pub struct ChecklistManager<S> {
    store: S,
    clock: Box<dyn Clock>,
    timezone: Tz,
}

impl<S: DocumentStore> ChecklistManager<S> {
    /// Create a manager using the system clock.
    pub fn new(store: S, timezone: Tz) -> Self {
        Self::with_clock(store, timezone, Box::new(SystemClock))
    }

    /// Create a manager with an explicit clock.
    pub fn with_clock(store: S, timezone: Tz, clock: Box<dyn Clock>) -> Self {
        Self { store, clock, timezone }
    }

    /// Create a manager with the configured reporting timezone.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured timezone is unknown.
    pub fn from_config(store: S, config: &BoardConfig) -> Result<Self> {
        Ok(Self::new(store, config.reporting_timezone()?))
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Task access keyed by category name.
    pub const fn tasks(&self) -> TaskRepository<'_, S> {
        TaskRepository::new(&self.store)
    }

    /// Tasks in a category, sorted by `sort_order`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexNotReady`] while the store builds the index this
    /// query needs, or any other read error.
    pub fn tasks_by_category(&self, name: &str) -> Result<Vec<Task>> {
        tracing::debug!(category = name, "reading tasks");
        self.tasks().tasks_by_category(name)
    }

    /// Tasks whose category is no longer in the category list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn orphaned_tasks(&self) -> Result<Vec<Task>> {
        let categories = self.list_categories()?;
        self.tasks().orphaned(&categories)
    }

    /// The current time formatted for the board, e.g. `06:05 AM`.
    fn board_time(&self) -> String {
        self.clock.now().with_timezone(&self.timezone).format("%I:%M %p").to_string()
    }

    // Categories

    /// Categories sorted by `order`.
    ///
    /// Returns the four default categories when no list has ever been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        match self.store.get(SETTINGS_COLLECTION, CATEGORIES_DOC)? {
            Some(doc) => Ok(parse_categories(&doc)),
            None => Ok(default_categories()),
        }
    }

    /// Replace the whole category list, renumbering `order` to list position.
    ///
    /// Last write wins between concurrent admins.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, for empty or duplicate names, or if the
    /// write fails.
    pub fn save_categories(
        &self,
        actor: &Actor,
        mut categories: Vec<Category>,
    ) -> Result<Vec<Category>> {
        actor.require_admin("edit categories")?;
        for category in &mut categories {
            category.name = category.name.trim().to_string();
        }
        validate_category_names(&categories)?;
        renumber_categories(&mut categories);

        self.store.set(
            SETTINGS_COLLECTION,
            CATEGORIES_DOC,
            categories_document(&categories),
            WriteMode::Replace,
        )?;
        tracing::info!(count = categories.len(), "saved category list");
        Ok(categories)
    }

    /// Append a new category at the end of the list.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, empty or duplicate names, or a failed write.
    pub fn add_category(&self, actor: &Actor, name: &str) -> Result<Category> {
        actor.require_admin("add categories")?;
        let name = name.trim();
        let mut categories = self.list_categories()?;
        categories.push(Category::new(name, 0));
        let saved = self.save_categories(actor, categories)?;
        saved
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::NotFound(format!("category '{name}'")))
    }

    /// Swap a category with its neighbour. Returns `false` at either end.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, unknown categories, or a failed write.
    pub fn move_category(&self, actor: &Actor, name: &str, direction: Direction) -> Result<bool> {
        actor.require_admin("reorder categories")?;
        let mut categories = self.list_categories()?;
        let index = position_of(&categories, name)?;
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|t| *t < categories.len()),
        };
        let Some(target) = target else {
            return Ok(false);
        };
        categories.swap(index, target);
        self.save_categories(actor, categories)?;
        Ok(true)
    }

    /// Rename a category, then retag its tasks one at a time.
    ///
    /// The status document stays under the old key, so the renamed category
    /// starts at NO GO.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, an unknown old name, an empty or taken
    /// new name, or [`Error::PartialApply`] if a write fails part way.
    pub fn rename_category(&self, actor: &Actor, old: &str, new: &str) -> Result<RenameReport> {
        let mut plan = self.plan_rename_category(actor, old, new)?;
        plan.run(&self.store)?;

        let retagged_tasks = plan.steps().iter().filter(|s| matches!(s, Step::Retag { .. })).count();
        let category = self
            .list_categories()?
            .into_iter()
            .find(|c| c.name == new.trim())
            .ok_or_else(|| Error::NotFound(format!("category '{}'", new.trim())))?;
        tracing::info!(old, new = %category.name, retagged_tasks, "renamed category");
        Ok(RenameReport { category, retagged_tasks })
    }

    /// Build the write plan for a rename without applying it.
    ///
    /// Step 1 writes the renamed list; each following step retags one task
    /// that carried the old name when the plan was built.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, an unknown old name, or an empty or taken
    /// new name.
    pub fn plan_rename_category(&self, actor: &Actor, old: &str, new: &str) -> Result<MutationPlan> {
        actor.require_admin("rename categories")?;
        let new = new.trim();
        let mut categories = self.list_categories()?;
        let index = position_of(&categories, old)?;
        categories[index].name = new.to_string();
        validate_category_names(&categories)?;
        renumber_categories(&mut categories);

        let mut steps = vec![Step::WriteCategories(categories)];
        if old != new {
            steps.extend(
                self.tasks()
                    .tasks_in_category_unordered(old)?
                    .into_iter()
                    .map(|t| Step::Retag { task_id: t.id, category: new.to_string() }),
            );
        }
        Ok(MutationPlan::new(
            Intent::RenameCategory { old: old.to_string(), new: new.to_string() },
            steps,
        ))
    }

    /// Remove a category from the list. Its tasks stay stored and become
    /// orphaned. Returns `false` if no such category.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers or a failed write.
    pub fn delete_category(&self, actor: &Actor, name: &str) -> Result<bool> {
        actor.require_admin("delete categories")?;
        let mut categories = self.list_categories()?;
        let before = categories.len();
        categories.retain(|c| c.name != name);
        if categories.len() == before {
            return Ok(false);
        }
        self.save_categories(actor, categories)?;
        tracing::info!(name, "deleted category; its tasks are now orphaned");
        Ok(true)
    }

    // Category status

    /// The status of a category, defaulting to NO GO with no note.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the document is malformed.
    pub fn get_category_status(&self, name: &str) -> Result<CategoryStatus> {
        match self.store.get(SETTINGS_COLLECTION, &status_key(name))? {
            Some(doc) => Ok(serde_json::from_value(Value::Object(doc))?),
            None => Ok(CategoryStatus::default()),
        }
    }

    /// Merge-write the supplied status fields.
    ///
    /// A non-empty note stamps the current board time; an empty note clears
    /// the timestamp too; no note leaves both untouched.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers or a failed write.
    pub fn set_category_status(
        &self,
        actor: &Actor,
        name: &str,
        update: StatusUpdate,
    ) -> Result<CategoryStatus> {
        actor.require_admin("change category status")?;
        let mut fields = Document::new();
        fields.insert("completed".to_string(), Value::from(update.completed));
        if let Some(note) = update.note {
            let timestamp = if note.is_empty() { String::new() } else { self.board_time() };
            fields.insert("note".to_string(), Value::from(note));
            fields.insert("timestamp".to_string(), Value::from(timestamp));
        }
        if let Some(show) = update.show_start_message {
            fields.insert("show_start_msg".to_string(), Value::from(show));
        }
        self.store.set(SETTINGS_COLLECTION, &status_key(name), fields, WriteMode::Merge)?;
        tracing::info!(category = name, go = update.completed, "updated category status");
        self.get_category_status(name)
    }

    // Tasks

    /// Add a task at the end of a category.
    ///
    /// The new `sort_order` is one past the category's current maximum, so
    /// it never collides with a surviving task after deletions.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, an empty title, an unknown category, or
    /// a failed write.
    pub fn add_task(&self, actor: &Actor, category: &str, title: &str) -> Result<Task> {
        actor.require_admin("add tasks")?;
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("task title must not be empty".into()));
        }
        if !self.list_categories()?.iter().any(|c| c.name == category) {
            return Err(Error::InvalidInput(format!("unknown category '{category}'")));
        }

        let tasks = self.tasks();
        let id = self.fresh_task_id(&tasks, title)?;
        let task = Task {
            id,
            category: category.to_string(),
            title: title.to_string(),
            sort_order: tasks.next_sort_order(category)?,
            ..Task::default()
        };
        tasks.insert(&task)?;
        tracing::info!(id = %task.id, category, sort_order = task.sort_order, "added task");
        Ok(task)
    }

    fn fresh_task_id(&self, tasks: &TaskRepository<'_, S>, title: &str) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = generate_task_id(title);
            if !tasks.exists(&id)? {
                return Ok(id);
            }
        }
        Err(Error::InvalidInput(format!("could not allocate a unique id for '{title}'")))
    }

    /// Swap a task with the one whose `sort_order` is `current_order + direction`
    /// in the same category. Returns `false` if there is no such neighbour.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, an unknown task, or
    /// [`Error::PartialApply`] if only one of the two writes landed.
    pub fn move_task(
        &self,
        actor: &Actor,
        task_id: &str,
        category: &str,
        current_order: i64,
        direction: Direction,
    ) -> Result<bool> {
        let Some(mut plan) =
            self.plan_move_task(actor, task_id, category, current_order, direction)?
        else {
            return Ok(false);
        };
        plan.run(&self.store)?;
        tracing::info!(task_id, category, from = current_order, "moved task");
        Ok(true)
    }

    /// Build the two-write swap plan for [`Self::move_task`] without applying it.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, an unknown task, a failed read, or a
    /// `current_order` that cannot move one step in `direction`.
    pub fn plan_move_task(
        &self,
        actor: &Actor,
        task_id: &str,
        category: &str,
        current_order: i64,
        direction: Direction,
    ) -> Result<Option<MutationPlan>> {
        actor.require_admin("reorder tasks")?;
        let in_category = self.tasks().tasks_in_category_unordered(category)?;
        if !in_category.iter().any(|t| t.id == task_id) {
            return Err(Error::NotFound(format!("task {task_id} in '{category}'")));
        }

        let target = current_order.checked_add(direction.offset()).ok_or_else(|| {
            Error::InvalidInput(format!("cannot move from sort order {current_order}"))
        })?;
        let Some(neighbour) = in_category.iter().find(|t| t.id != task_id && t.sort_order == target)
        else {
            return Ok(None);
        };

        Ok(Some(MutationPlan::new(
            Intent::SwapTasks { task_id: task_id.to_string(), neighbour_id: neighbour.id.clone() },
            vec![
                Step::SetSortOrder { task_id: task_id.to_string(), sort_order: target },
                Step::SetSortOrder { task_id: neighbour.id.clone(), sort_order: current_order },
            ],
        )))
    }

    /// Rewrite a category's task orders to `0..N-1`, keeping the current order
    /// (ties broken by title, then id). Returns how many tasks changed.
    ///
    /// This heals duplicate orders left by an interrupted swap.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers or [`Error::PartialApply`] on a failed write.
    pub fn renumber_tasks(&self, actor: &Actor, category: &str) -> Result<usize> {
        actor.require_admin("renumber tasks")?;
        let mut tasks = self.tasks().tasks_in_category_unordered(category)?;
        tasks.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });

        let steps: Vec<Step> = tasks
            .into_iter()
            .zip(0..)
            .filter(|(task, order)| task.sort_order != *order)
            .map(|(task, order)| Step::SetSortOrder { task_id: task.id, sort_order: order })
            .collect();
        let changed = steps.len();
        MutationPlan::new(Intent::RenumberTasks { category: category.to_string() }, steps)
            .run(&self.store)?;
        tracing::info!(category, changed, "renumbered tasks");
        Ok(changed)
    }

    /// Set a task's completion flag, honouring the completion lock.
    ///
    /// Anyone may confirm a task. Only an admin may reopen a confirmed one.
    /// A real change writes `completed` and `completed_at`, then appends one
    /// history line. Setting the current value writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompletionLocked`] when a viewer tries to reopen,
    /// [`Error::NotFound`] for an unknown task, or a write error.
    pub fn set_task_completion(&self, actor: &Actor, task_id: &str, completed: bool) -> Result<Task> {
        let tasks = self.tasks();
        let task = tasks.get(task_id)?.ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        if task.completed == completed {
            return Ok(task);
        }
        let to = CompletionState::from_completed(completed);
        if !task.state().can_transition(to, actor.role) {
            return Err(Error::CompletionLocked(task_id.to_string()));
        }

        let completed_at =
            if completed { Value::from(self.clock.now().to_rfc3339()) } else { Value::Null };
        let mut fields = Document::new();
        fields.insert("completed".to_string(), Value::from(completed));
        fields.insert("completed_at".to_string(), completed_at);
        if !tasks.update_fields(task_id, fields)? {
            return Err(Error::NotFound(format!("task {task_id}")));
        }

        let verb = if completed { "Completed" } else { "Reopened" };
        let line = format!("{verb} by {} at {}", actor.role, self.board_time());
        tasks.append_history(task_id, &line)?;
        tracing::info!(task_id, completed, role = %actor.role, "task completion changed");

        tasks.get(task_id)?.ok_or_else(|| Error::NotFound(format!("task {task_id}")))
    }

    /// Replace a task's notes.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, an unknown task, or a failed write.
    pub fn set_task_notes(&self, actor: &Actor, task_id: &str, notes: &str) -> Result<Task> {
        actor.require_admin("edit task notes")?;
        self.update_task_field(task_id, "notes", Value::from(notes))
    }

    /// Change a task's title.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers, an empty title, an unknown task, or a
    /// failed write.
    pub fn rename_task(&self, actor: &Actor, task_id: &str, title: &str) -> Result<Task> {
        actor.require_admin("edit task titles")?;
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("task title must not be empty".into()));
        }
        self.update_task_field(task_id, "title", Value::from(title))
    }

    /// Delete a task. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers or a failed delete.
    pub fn delete_task(&self, actor: &Actor, task_id: &str) -> Result<bool> {
        actor.require_admin("delete tasks")?;
        let deleted = self.tasks().delete(task_id)?;
        if deleted {
            tracing::info!(task_id, "deleted task");
        }
        Ok(deleted)
    }

    fn update_task_field(&self, task_id: &str, field: &str, value: Value) -> Result<Task> {
        let tasks = self.tasks();
        let mut fields = Document::new();
        fields.insert(field.to_string(), value);
        if !tasks.update_fields(task_id, fields)? {
            return Err(Error::NotFound(format!("task {task_id}")));
        }
        tasks.get(task_id)?.ok_or_else(|| Error::NotFound(format!("task {task_id}")))
    }
}

/// Reject empty names and names that clash, directly or once sanitized.
fn validate_category_names(categories: &[Category]) -> Result<()> {
    let mut names = HashSet::new();
    let mut keys = HashSet::new();
    for category in categories {
        if category.name.is_empty() {
            return Err(Error::InvalidInput("category name must not be empty".into()));
        }
        if !names.insert(category.name.as_str()) {
            return Err(Error::InvalidInput(format!("duplicate category '{}'", category.name)));
        }
        if !keys.insert(sanitize_key(&category.name)) {
            return Err(Error::InvalidInput(format!(
                "category '{}' clashes with another category's storage key",
                category.name
            )));
        }
    }
    Ok(())
}

fn position_of(categories: &[Category], name: &str) -> Result<usize> {
    categories
        .iter()
        .position(|c| c.name == name)
        .ok_or_else(|| Error::NotFound(format!("category '{name}'")))
}
