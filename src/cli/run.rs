//! Command execution for the CLI.
//!
//! This module handles running CLI commands and producing output.

use crate::board::{Board, RefreshOutcome};
use crate::checklist::{Actor, ChecklistManager, Direction, StatusUpdate, Task};
use crate::cli::{Cli, CategoryCommand, Command, GoState, StaffCommand, StatusCommand, TaskCommand};
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::paths;
use crate::poll::RefreshLoop;
use crate::staff;
use crate::storage::SqliteDocumentStore;
use crate::templates::{self, STAFF_TEMPLATE};
use crate::traits::SystemClock;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

type Manager = ChecklistManager<SqliteDocumentStore>;

/// Everything a command needs: where the event lives, its config and who is asking.
struct Session {
    event_dir: PathBuf,
    config: BoardConfig,
    db: Option<PathBuf>,
    actor: Actor,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let event_dir = match &cli.event_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let config = BoardConfig::load_or_default(&event_dir)?;
        let actor = Actor::authenticate(&config, cli.password.as_deref());
        tracing::debug!(role = %actor.role, event_dir = %event_dir.display(), "session opened");
        Ok(Self { event_dir, config, db: cli.db.clone(), actor })
    }

    fn db_path(&self) -> Result<PathBuf> {
        if let Some(db) = &self.db {
            return Ok(db.clone());
        }
        if let Some(configured) = &self.config.database_path {
            return Ok(if configured.is_absolute() {
                configured.clone()
            } else {
                self.event_dir.join(configured)
            });
        }
        paths::event_db_path(&self.event_dir)
            .ok_or_else(|| Error::StoreUnavailable("cannot determine home directory".into()))
    }

    fn manager(&self) -> Result<Manager> {
        let store = SqliteDocumentStore::with_path(self.db_path()?)?;
        ChecklistManager::from_config(store, &self.config)
    }
}

/// Run a parsed CLI invocation.
pub fn run(cli: Cli) -> CliOutput {
    if let Command::Version = cli.command {
        return success_output(format!("race-checklist v{}", crate::VERSION));
    }

    let session = match Session::open(&cli) {
        Ok(s) => s,
        Err(e) => return error_output(&e),
    };

    match cli.command {
        Command::Version => success_output(format!("race-checklist v{}", crate::VERSION)),
        Command::InitConfig => run_init_config(&session.event_dir),
        Command::Board { watch, ticks } => with_manager(&session, |m| {
            if watch {
                Ok(run_board_watch(m, &session, ticks))
            } else {
                Ok(run_board_once(m, &session.actor))
            }
        }),
        Command::Category(cmd) => with_manager(&session, |m| run_category_cmd(m, &session.actor, cmd)),
        Command::Status(cmd) => with_manager(&session, |m| run_status_cmd(m, &session.actor, cmd)),
        Command::Task(cmd) => with_manager(&session, |m| run_task_cmd(m, &session.actor, cmd)),
        Command::Staff(cmd) => with_manager(&session, |m| run_staff_cmd(m, cmd)),
    }
}

fn with_manager<F>(session: &Session, f: F) -> CliOutput
where
    F: FnOnce(&Manager) -> Result<CliOutput>,
{
    match session.manager().and_then(|m| f(&m)) {
        Ok(output) => output,
        Err(e) => error_output(&e),
    }
}

// === Utility Commands ===

fn run_init_config(event_dir: &Path) -> CliOutput {
    let path = BoardConfig::config_path(event_dir);
    if path.exists() {
        return success_output(format!("Config already exists at {}", path.display()));
    }
    match BoardConfig::default().save_to(event_dir) {
        Ok(()) => success_output(format!(
            "Wrote {} (set admin_password to enable admin commands)",
            path.display()
        )),
        Err(e) => error_output(&e),
    }
}

// === Board ===

fn run_board_once(manager: &Manager, actor: &Actor) -> CliOutput {
    let outcome = Board::new(manager).refresh(actor);
    match outcome.render() {
        Ok(text) if outcome.is_halted() => {
            CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![text] }
        }
        Ok(text) => success_output(text),
        Err(e) => error_output(&e),
    }
}

fn run_board_watch(manager: &Manager, session: &Session, ticks: Option<u64>) -> CliOutput {
    let mut refresh = RefreshLoop::new(session.config.refresh_interval());
    if let Some(max) = ticks {
        refresh = refresh.with_max_ticks(max);
    }

    let board = Board::new(manager);
    let mut halted = None;
    refresh.run(|tick| {
        let outcome = board.refresh(&session.actor);
        match outcome.render() {
            Ok(text) if outcome.is_halted() => halted = Some(text),
            Ok(text) => {
                if tick > 0 {
                    // Clear the terminal between frames.
                    print!("\x1B[2J\x1B[H");
                }
                println!("{text}");
            }
            Err(e) => halted = Some(e.to_string()),
        }
        if halted.is_some() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    match halted {
        Some(message) => {
            CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
        }
        None => CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![], stderr: vec![] },
    }
}

// === Categories ===

fn run_category_cmd(manager: &Manager, actor: &Actor, cmd: CategoryCommand) -> Result<CliOutput> {
    match cmd {
        CategoryCommand::List => Ok(json_output(&manager.list_categories()?)),
        CategoryCommand::Add { name } => Ok(json_output(&manager.add_category(actor, &name)?)),
        CategoryCommand::Rename { old, new } => {
            let report = manager.rename_category(actor, &old, &new)?;
            Ok(success_output(format!(
                "Renamed '{old}' to '{}' ({} tasks moved)",
                report.category.name, report.retagged_tasks
            )))
        }
        CategoryCommand::Delete { name } => {
            if manager.delete_category(actor, &name)? {
                Ok(success_output(format!("Deleted category '{name}'; its tasks are orphaned")))
            } else {
                Err(Error::NotFound(format!("category '{name}'")))
            }
        }
        CategoryCommand::Move { name, direction } => {
            if manager.move_category(actor, &name, direction.into())? {
                Ok(json_output(&manager.list_categories()?))
            } else {
                Ok(success_output(format!("'{name}' is already at the edge")))
            }
        }
    }
}

fn run_status_cmd(manager: &Manager, actor: &Actor, cmd: StatusCommand) -> Result<CliOutput> {
    match cmd {
        StatusCommand::Show { category } => {
            Ok(json_output(&manager.get_category_status(&category)?))
        }
        StatusCommand::Set { category, state, note, start_message } => {
            let update = StatusUpdate {
                completed: state == GoState::Go,
                note,
                show_start_message: start_message,
            };
            Ok(json_output(&manager.set_category_status(actor, &category, update)?))
        }
    }
}

// === Tasks ===

fn run_task_cmd(manager: &Manager, actor: &Actor, cmd: TaskCommand) -> Result<CliOutput> {
    match cmd {
        TaskCommand::List { category } => {
            let tasks = manager.tasks_by_category(&category)?;
            Ok(json_output(&tasks.iter().map(TaskOutput::from).collect::<Vec<_>>()))
        }
        TaskCommand::Get { id } => {
            let task = manager
                .tasks()
                .get(&id)?
                .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
            Ok(json_output(&TaskOutput::from(&task)))
        }
        TaskCommand::Add { category, title } => {
            Ok(json_output(&TaskOutput::from(&manager.add_task(actor, &category, &title)?)))
        }
        TaskCommand::Complete { id } => task_completion(manager, actor, &id, true),
        TaskCommand::Reopen { id } => task_completion(manager, actor, &id, false),
        TaskCommand::Move { id, direction } => task_move(manager, actor, &id, direction.into()),
        TaskCommand::Notes { id, notes } => {
            Ok(json_output(&TaskOutput::from(&manager.set_task_notes(actor, &id, &notes)?)))
        }
        TaskCommand::Rename { id, title } => {
            Ok(json_output(&TaskOutput::from(&manager.rename_task(actor, &id, &title)?)))
        }
        TaskCommand::Delete { id } => {
            if manager.delete_task(actor, &id)? {
                Ok(success_output(format!("Deleted task {id}")))
            } else {
                Err(Error::NotFound(format!("task {id}")))
            }
        }
        TaskCommand::Renumber { category } => {
            let changed = manager.renumber_tasks(actor, &category)?;
            Ok(success_output(format!("Renumbered '{category}' ({changed} tasks changed)")))
        }
        TaskCommand::Orphans => {
            actor.require_admin("list orphaned tasks")?;
            let orphans = manager.orphaned_tasks()?;
            Ok(json_output(&orphans.iter().map(TaskOutput::from).collect::<Vec<_>>()))
        }
    }
}

fn task_completion(manager: &Manager, actor: &Actor, id: &str, completed: bool) -> Result<CliOutput> {
    let task = manager.set_task_completion(actor, id, completed)?;
    Ok(json_output(&TaskOutput::from(&task)))
}

fn task_move(manager: &Manager, actor: &Actor, id: &str, direction: Direction) -> Result<CliOutput> {
    let task = manager.tasks().get(id)?.ok_or_else(|| Error::NotFound(format!("task {id}")))?;
    if manager.move_task(actor, id, &task.category, task.sort_order, direction)? {
        let tasks = manager.tasks_by_category(&task.category)?;
        Ok(json_output(&tasks.iter().map(TaskOutput::from).collect::<Vec<_>>()))
    } else {
        Ok(success_output(format!("'{}' is already at the edge", task.title)))
    }
}

// === Staff ===

fn run_staff_cmd(manager: &Manager, cmd: StaffCommand) -> Result<CliOutput> {
    match cmd {
        StaffCommand::Checkin { name, latitude, longitude } => {
            let location =
                staff::record_location(manager.store(), &SystemClock, &name, latitude, longitude)?;
            Ok(json_output(&location))
        }
        StaffCommand::List => {
            let locations = staff::list_locations(manager.store())?;
            let mut context = tera::Context::new();
            context.insert("locations", &locations);
            Ok(success_output(templates::render(STAFF_TEMPLATE, &context)?))
        }
    }
}

// === Output helpers ===

fn json_output<T: Serialize>(value: &T) -> CliOutput {
    match serde_json::to_string_pretty(value) {
        Ok(json) => CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![json], stderr: vec![] },
        Err(e) => error_output(&e),
    }
}

fn success_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![message], stderr: vec![] }
}

fn error_output(error: &dyn std::fmt::Display) -> CliOutput {
    CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![format!("Error: {error}")] }
}

// === Output Types ===

/// A task as printed by the CLI, including its id.
#[derive(Debug, Serialize)]
struct TaskOutput {
    id: String,
    category: String,
    title: String,
    completed: bool,
    notes: String,
    sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    history: Vec<String>,
}

impl From<&Task> for TaskOutput {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            category: task.category.clone(),
            title: task.title.clone(),
            completed: task.completed,
            notes: task.notes.clone(),
            sort_order: task.sort_order,
            completed_at: task.completed_at,
            history: task.history.clone(),
        }
    }
}
