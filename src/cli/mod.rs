//! Hierarchical CLI for race-checklist.
//!
//! Viewers run `board` (optionally `--watch`) and `task complete`. Everything
//! else needs `--password` matching the event's configured admin password.

mod category;
mod run;
mod staff;
mod task;


pub use category::{CategoryCommand, GoState, StatusCommand};
pub use run::{run, CliOutput};
pub use staff::StaffCommand;
pub use task::TaskCommand;

use crate::checklist::Direction;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Race-day checklist and GO / NO GO status board.
///
/// For detailed help on any command group, use:
///   race-checklist <command> --help
#[derive(Parser, Debug)]
#[command(name = "race-checklist")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Event directory holding `.race-checklist/config.yaml` (default: current directory)
    #[arg(long, global = true)]
    pub event_dir: Option<PathBuf>,

    /// Board database file, overriding the config and the per-event default
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Admin password; without it you act as a viewer
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the status board.
    ///
    /// With `--watch` the board is re-read and re-printed every
    /// `refresh_interval_secs` until the store becomes unreachable.
    Board {
        /// Keep refreshing
        #[arg(short, long)]
        watch: bool,

        /// Stop watching after this many refreshes
        #[arg(long, requires = "watch")]
        ticks: Option<u64>,
    },

    /// Category list management.
    #[command(subcommand)]
    Category(CategoryCommand),

    /// GO / NO GO status per category.
    #[command(subcommand)]
    Status(StatusCommand),

    /// Task management. `complete` is open to viewers.
    #[command(subcommand)]
    Task(TaskCommand),

    /// Staff check-in locations.
    #[command(subcommand)]
    Staff(StaffCommand),

    /// Write a default config file for this event if none exists.
    #[command(name = "init-config")]
    InitConfig,

    /// Show version information.
    Version,
}

/// Direction argument for move commands.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Towards the top of the board
    Up,
    /// Towards the bottom of the board
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Self::Up,
            MoveDirection::Down => Self::Down,
        }
    }
}
