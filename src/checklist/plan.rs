//! Two-phase mutation plans for operations that touch several documents.
//!
//! Swapping two tasks and renaming a category each need more than one write,
//! and the store offers no cross-document transaction. A [`MutationPlan`]
//! records the intent and the exact writes up front, then applies them one at
//! a time. If a write fails the plan keeps its position, and the state left
//! behind is one of the documented intermediate states:
//!
//! - swap stopped after the first write: both tasks share one `sort_order`
//!   until the next move or `renumber_tasks`.
//! - rename stopped after the list write: tasks still tagged with the old
//!   name are orphaned and show up in the admin orphan list.

use crate::checklist::models::Category;
use crate::checklist::{categories_document, CATEGORIES_DOC, SETTINGS_COLLECTION, TASKS_COLLECTION};
use crate::error::{Error, Result};
use crate::traits::{Document, DocumentStore, WriteMode};
use serde_json::Value;

/// What a plan is trying to achieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Swap the positions of two tasks in one category.
    SwapTasks {
        /// The task being moved.
        task_id: String,
        /// The neighbour it trades places with.
        neighbour_id: String,
    },
    /// Rename a category and retag its tasks.
    RenameCategory {
        /// Previous name.
        old: String,
        /// New name.
        new: String,
    },
    /// Rewrite a category's task orders to `0..N-1`.
    RenumberTasks {
        /// Category being renumbered.
        category: String,
    },
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SwapTasks { task_id, neighbour_id } => {
                write!(f, "swap {task_id} with {neighbour_id}")
            }
            Self::RenameCategory { old, new } => write!(f, "rename '{old}' to '{new}'"),
            Self::RenumberTasks { category } => write!(f, "renumber tasks in '{category}'"),
        }
    }
}

/// One single-document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Replace the category list document.
    WriteCategories(Vec<Category>),
    /// Set a task's `sort_order`. Fails if the task is gone.
    SetSortOrder {
        /// Task to update.
        task_id: String,
        /// New position.
        sort_order: i64,
    },
    /// Point a task at a category name. A task deleted meanwhile is skipped.
    Retag {
        /// Task to update.
        task_id: String,
        /// New category name.
        category: String,
    },
}

impl Step {
    fn apply<S: DocumentStore>(&self, store: &S) -> Result<()> {
        match self {
            Self::WriteCategories(categories) => store.set(
                SETTINGS_COLLECTION,
                CATEGORIES_DOC,
                categories_document(categories),
                WriteMode::Replace,
            ),
            Self::SetSortOrder { task_id, sort_order } => {
                let mut fields = Document::new();
                fields.insert("sort_order".to_string(), Value::from(*sort_order));
                if store.update(TASKS_COLLECTION, task_id, fields)? {
                    Ok(())
                } else {
                    Err(Error::NotFound(format!("task {task_id}")))
                }
            }
            Self::Retag { task_id, category } => {
                let mut fields = Document::new();
                fields.insert("category".to_string(), Value::from(category.as_str()));
                store.update(TASKS_COLLECTION, task_id, fields)?;
                Ok(())
            }
        }
    }
}

/// An intent plus the ordered writes that realize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    intent: Intent,
    steps: Vec<Step>,
    applied: usize,
}

impl MutationPlan {
    /// Create a plan with nothing applied yet.
    #[must_use]
    pub const fn new(intent: Intent, steps: Vec<Step>) -> Self {
        Self { intent, steps, applied: 0 }
    }

    /// All steps, applied or not.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps written so far.
    #[must_use]
    pub const fn applied(&self) -> usize {
        self.applied
    }

    /// Steps not yet written.
    #[must_use]
    pub fn remaining(&self) -> &[Step] {
        &self.steps[self.applied..]
    }

    /// Whether every step has been written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.applied == self.steps.len()
    }

    /// Apply exactly one step. Returns `false` when nothing was left.
    ///
    /// # Errors
    ///
    /// Returns the step's error; the step stays pending.
    pub fn apply_next<S: DocumentStore>(&mut self, store: &S) -> Result<bool> {
        let Some(step) = self.steps.get(self.applied) else {
            return Ok(false);
        };
        step.apply(store)?;
        self.applied += 1;
        Ok(true)
    }

    /// Apply every remaining step in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartialApply`] naming how far the plan got.
    pub fn run<S: DocumentStore>(&mut self, store: &S) -> Result<()> {
        loop {
            match self.apply_next(store) {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        intent = %self.intent,
                        applied = self.applied,
                        total = self.steps.len(),
                        error = %e,
                        "multi-document write stopped part way"
                    );
                    return Err(Error::PartialApply {
                        intent: self.intent.to_string(),
                        applied: self.applied,
                        total: self.steps.len(),
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}
