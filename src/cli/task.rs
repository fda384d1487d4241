//! Task CLI subcommands.

use crate::cli::MoveDirection;
use clap::Subcommand;

/// Task commands.
///
/// Anyone may `complete` a task. Reopening and every edit need admin.
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// List a category's tasks in order.
    List {
        /// Category name
        category: String,
    },

    /// Show one task with its history.
    Get {
        /// Task ID
        id: String,
    },

    /// Add a task at the end of a category.
    Add {
        /// Category name
        category: String,
        /// Task title
        title: String,
    },

    /// Mark a task done.
    Complete {
        /// Task ID
        id: String,
    },

    /// Mark a done task as not done (admin).
    Reopen {
        /// Task ID
        id: String,
    },

    /// Swap a task with its neighbour.
    Move {
        /// Task ID
        id: String,
        /// Direction to move
        #[arg(value_enum)]
        direction: MoveDirection,
    },

    /// Replace a task's notes.
    Notes {
        /// Task ID
        id: String,
        /// New notes
        notes: String,
    },

    /// Change a task's title.
    Rename {
        /// Task ID
        id: String,
        /// New title
        title: String,
    },

    /// Delete a task.
    Delete {
        /// Task ID
        id: String,
    },

    /// Rewrite a category's task order to 0..N-1.
    Renumber {
        /// Category name
        category: String,
    },

    /// List tasks whose category no longer exists.
    Orphans,
}
