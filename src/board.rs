//! The status board: one read-then-render cycle per refresh.
//!
//! A refresh reads the category list, each category's status and tasks,
//! and (for admins) the orphaned tasks, then classifies what went wrong:
//!
//! - an index still being built degrades only the categories whose task
//!   query needed it;
//! - any other read failure degrades the whole board to the default empty
//!   state with a notice;
//! - losing the store entirely halts the board.

use crate::checklist::{Actor, Category, CategoryStatus, ChecklistManager, Role, Task};
use crate::error::{Error, Result};
use crate::templates::{self, BOARD_TEMPLATE, HALTED_TEMPLATE};
use crate::traits::DocumentStore;
use serde::Serialize;

/// Notice shown while the store is still building an index.
pub const INDEX_NOTICE: &str = "Task order is still being indexed. Try again in a few minutes.";

/// Notice shown when a read failed for any other reason.
pub const READ_FAILURE_NOTICE: &str = "Could not read the checklist. Try again shortly.";

/// One task as the board shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    /// Task id.
    pub id: String,
    /// Category name the task carries.
    pub category: String,
    /// Title.
    pub title: String,
    /// Notes.
    pub notes: String,
    /// Whether the task is confirmed done.
    pub completed: bool,
    /// Whether the viewing actor can no longer change this task.
    pub locked: bool,
    /// Position within the category.
    pub sort_order: i64,
}

impl TaskView {
    fn new(task: Task, role: Role) -> Self {
        Self {
            locked: task.completed && role != Role::Admin,
            id: task.id,
            category: task.category,
            title: task.title,
            notes: task.notes,
            completed: task.completed,
            sort_order: task.sort_order,
        }
    }
}

/// One category section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    /// Category name.
    pub name: String,
    /// Position on the board.
    pub order: i64,
    /// `GO` or `NO GO`.
    pub label: String,
    /// Current status.
    pub status: CategoryStatus,
    /// Tasks in `sort_order`.
    pub tasks: Vec<TaskView>,
    /// Set when the task query could not be served this tick.
    pub unavailable: bool,
}

/// Everything one refresh read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    /// Role the snapshot was built for.
    pub role: Role,
    /// Category sections in board order.
    pub categories: Vec<CategoryView>,
    /// Tasks whose category is gone. Always empty for viewers.
    pub orphaned: Vec<TaskView>,
    /// Message shown above the board when something could not be read.
    pub notice: Option<String>,
}

impl BoardSnapshot {
    /// An empty board carrying only a notice.
    #[must_use]
    pub fn empty(role: Role, notice: impl Into<String>) -> Self {
        Self { role, categories: Vec::new(), orphaned: Vec::new(), notice: Some(notice.into()) }
    }

    /// Look up a category section by name.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryView> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Result of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Everything was read.
    Rendered(BoardSnapshot),
    /// Something was unreadable; the snapshot carries a notice.
    Degraded(BoardSnapshot),
    /// The store is unreachable; stop rendering.
    Halted(String),
}

impl RefreshOutcome {
    /// The snapshot, unless the board halted.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&BoardSnapshot> {
        match self {
            Self::Rendered(s) | Self::Degraded(s) => Some(s),
            Self::Halted(_) => None,
        }
    }

    /// Whether polling should stop.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self, Self::Halted(_))
    }

    /// Render this outcome as board text.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn render(&self) -> Result<String> {
        match self {
            Self::Rendered(snapshot) | Self::Degraded(snapshot) => {
                templates::render_value(BOARD_TEMPLATE, snapshot)
            }
            Self::Halted(message) => {
                let mut context = tera::Context::new();
                context.insert("message", message);
                templates::render(HALTED_TEMPLATE, &context)
            }
        }
    }
}

/// The read side of the board.
pub struct Board<'a, S> {
    manager: &'a ChecklistManager<S>,
}

impl<'a, S: DocumentStore> Board<'a, S> {
    /// Wrap a manager.
    pub const fn new(manager: &'a ChecklistManager<S>) -> Self {
        Self { manager }
    }

    /// Read the whole board for `actor`. Never fails; failures are folded
    /// into the outcome.
    pub fn refresh(&self, actor: &Actor) -> RefreshOutcome {
        match self.read(actor) {
            Ok((snapshot, false)) => RefreshOutcome::Rendered(snapshot),
            Ok((snapshot, true)) => {
                tracing::warn!("board refreshed without task order; index not ready");
                RefreshOutcome::Degraded(snapshot)
            }
            Err(e) if e.is_connectivity_loss() => {
                tracing::warn!(error = %e, "board halted; store unreachable");
                RefreshOutcome::Halted(e.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "board refresh failed; showing empty board");
                RefreshOutcome::Degraded(BoardSnapshot::empty(actor.role, READ_FAILURE_NOTICE))
            }
        }
    }

    /// Returns the snapshot and whether any category lacked its tasks.
    fn read(&self, actor: &Actor) -> Result<(BoardSnapshot, bool)> {
        let categories = self.manager.list_categories()?;
        let mut views = Vec::with_capacity(categories.len());
        let mut index_missing = false;

        for category in &categories {
            let view = self.read_category(category, actor.role)?;
            index_missing |= view.unavailable;
            views.push(view);
        }

        let orphaned = if actor.is_admin() {
            self.manager
                .tasks()
                .orphaned(&categories)?
                .into_iter()
                .map(|t| TaskView::new(t, actor.role))
                .collect()
        } else {
            Vec::new()
        };

        let notice = index_missing.then(|| INDEX_NOTICE.to_string());
        Ok((BoardSnapshot { role: actor.role, categories: views, orphaned, notice }, index_missing))
    }

    fn read_category(&self, category: &Category, role: Role) -> Result<CategoryView> {
        let status = match self.manager.get_category_status(&category.name) {
            Ok(status) => status,
            Err(Error::Json(e)) => {
                tracing::warn!(
                    category = %category.name,
                    error = %e,
                    "malformed status; showing NO GO"
                );
                CategoryStatus::default()
            }
            Err(e) => return Err(e),
        };
        let (tasks, unavailable) = match self.manager.tasks_by_category(&category.name) {
            Ok(tasks) => (tasks.into_iter().map(|t| TaskView::new(t, role)).collect(), false),
            Err(Error::IndexNotReady(detail)) => {
                tracing::debug!(category = %category.name, detail = %detail, "task index not ready");
                (Vec::new(), true)
            }
            Err(e) => return Err(e),
        };
        Ok(CategoryView {
            name: category.name.clone(),
            order: category.order,
            label: status.label().to_string(),
            status,
            tasks,
            unavailable,
        })
    }
}
