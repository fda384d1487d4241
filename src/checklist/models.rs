//! Model types for the race-day checklist.

use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::traits::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who is acting on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A race official who may edit everything and reopen tasks.
    Admin,
    /// Anyone watching the board. May only confirm tasks as done.
    #[default]
    Viewer,
}

impl Role {
    /// Get the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capability token passed into every checklist call whose rules depend on
/// who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actor {
    /// The actor's role.
    pub role: Role,
}

impl Actor {
    /// An admin actor.
    #[must_use]
    pub const fn admin() -> Self {
        Self { role: Role::Admin }
    }

    /// A plain viewer.
    #[must_use]
    pub const fn viewer() -> Self {
        Self { role: Role::Viewer }
    }

    /// Grant admin when the password matches the configured one exactly.
    ///
    /// An empty configured password never grants admin.
    #[must_use]
    pub fn authenticate(config: &BoardConfig, password: Option<&str>) -> Self {
        match password {
            Some(given) if !config.admin_password.is_empty() && given == config.admin_password => {
                Self::admin()
            }
            _ => Self::viewer(),
        }
    }

    /// Whether this actor holds the admin capability.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Fail with [`Error::AdminRequired`] unless this actor is an admin.
    ///
    /// # Errors
    ///
    /// Returns an error for viewers.
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::AdminRequired(action.to_string()))
        }
    }
}

/// Completion state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// Not yet confirmed.
    Incomplete,
    /// Confirmed done.
    Complete,
}

impl CompletionState {
    /// State for a `completed` flag.
    #[must_use]
    pub const fn from_completed(completed: bool) -> Self {
        if completed {
            Self::Complete
        } else {
            Self::Incomplete
        }
    }

    /// Whether `role` may move a task from this state to `to`.
    ///
    /// Anyone may confirm a task; only an admin may reopen a confirmed one.
    #[must_use]
    pub const fn can_transition(self, to: Self, role: Role) -> bool {
        match (self, to) {
            (Self::Complete, Self::Incomplete) => matches!(role, Role::Admin),
            _ => true,
        }
    }
}

/// Which way to move an item in an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the start of the list.
    Up,
    /// Towards the end of the list.
    Down,
}

impl Direction {
    /// Signed offset of one step in this direction.
    #[must_use]
    pub const fn offset(self) -> i64 {
        match self {
            Self::Up => -1,
            Self::Down => 1,
        }
    }
}

/// A named group of tasks with an explicit display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique display name.
    pub name: String,
    /// Position in the category list, 0-based.
    #[serde(default)]
    pub order: i64,
}

impl Category {
    /// Create a category.
    #[must_use]
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self { name: name.into(), order }
    }
}

/// GO / NO GO readiness of one category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryStatus {
    /// True means GO.
    pub completed: bool,
    /// Free-text note shown under the status.
    pub note: String,
    /// When the note was last written, in the reporting timezone.
    #[serde(rename = "timestamp")]
    pub note_timestamp: String,
    /// Whether the start-line message is shown for this category.
    #[serde(rename = "show_start_msg")]
    pub show_start_message: bool,
}

impl CategoryStatus {
    /// Label shown on the board.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        if self.completed {
            "GO"
        } else {
            "NO GO"
        }
    }
}

/// Fields to merge into a category status. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    /// New GO / NO GO value.
    pub completed: bool,
    /// New note. `Some("")` clears the note and its timestamp.
    pub note: Option<String>,
    /// New start-message flag.
    pub show_start_message: Option<bool>,
}

impl StatusUpdate {
    /// Update only the GO / NO GO flag.
    #[must_use]
    pub const fn status(completed: bool) -> Self {
        Self { completed, note: None, show_start_message: None }
    }

    /// Also set the note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Also set the start-message flag.
    #[must_use]
    pub const fn with_start_message(mut self, show: bool) -> Self {
        self.show_start_message = Some(show);
        self
    }
}

/// A single checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    /// Document key. Not stored inside the document.
    #[serde(skip_serializing)]
    pub id: String,
    /// Name of the category this task belongs to.
    pub category: String,
    /// Short title.
    pub title: String,
    /// Whether the task is confirmed done.
    pub completed: bool,
    /// Free-text notes.
    pub notes: String,
    /// Position within the category.
    pub sort_order: i64,
    /// When the task was last confirmed done.
    pub completed_at: Option<DateTime<Utc>>,
    /// Append-only log of completion changes.
    pub history: Vec<String>,
}

impl Task {
    /// Build a task from a stored document, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a present field has the wrong type.
    pub fn from_document(id: &str, data: Document) -> Result<Self> {
        let mut task: Self = serde_json::from_value(Value::Object(data))?;
        task.id = id.to_string();
        Ok(task)
    }

    /// The stored form of this task (without its id).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Document::new()),
        }
    }

    /// Current completion state.
    #[must_use]
    pub const fn state(&self) -> CompletionState {
        CompletionState::from_completed(self.completed)
    }
}
