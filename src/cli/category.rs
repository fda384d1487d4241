//! Category and status CLI subcommands.

use crate::cli::MoveDirection;
use clap::{Subcommand, ValueEnum};

/// Category list commands. All but `list` need admin.
#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// List categories in board order.
    List,

    /// Add a category at the end of the board.
    Add {
        /// Category name
        name: String,
    },

    /// Rename a category and move its tasks to the new name.
    ///
    /// The renamed category starts at NO GO.
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },

    /// Remove a category. Its tasks are kept and listed as orphaned.
    Delete {
        /// Category name
        name: String,
    },

    /// Move a category one place up or down.
    Move {
        /// Category name
        name: String,
        /// Direction to move
        #[arg(value_enum)]
        direction: MoveDirection,
    },
}

/// GO / NO GO value for `status set`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoState {
    /// Ready
    Go,
    /// Not ready
    NoGo,
}

/// Category status commands.
#[derive(Subcommand, Debug, Clone)]
pub enum StatusCommand {
    /// Show one category's status.
    Show {
        /// Category name
        category: String,
    },

    /// Set a category's status (admin).
    ///
    /// Only the flags you pass are changed. `--note ""` clears the note.
    Set {
        /// Category name
        category: String,
        /// New status
        #[arg(value_enum)]
        state: GoState,
        /// Note shown under the status
        #[arg(short, long)]
        note: Option<String>,
        /// Show or hide the start-line message
        #[arg(long)]
        start_message: Option<bool>,
    },
}
