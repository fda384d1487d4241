//! Path utilities for determining data storage locations.
//!
//! Board databases live in `~/.race-checklist/events/<name>-<hash>/`, one per
//! event directory, so two race events run from different folders never share
//! a checklist by accident.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// The base directory name for race-checklist data.
const DATA_DIR_NAME: &str = ".race-checklist";

/// The database filename.
pub const DATABASE_FILENAME: &str = "board.sqlite3";

/// Get the base data directory, `~/.race-checklist/`.
///
/// Returns `None` if the home directory cannot be determined.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME))
}

/// Get the data directory for one event directory.
#[must_use]
pub fn event_data_dir(event_dir: &Path) -> Option<PathBuf> {
    let base = data_dir()?;
    Some(base.join("events").join(event_dir_name(event_dir)))
}

/// Get the database path for one event directory.
#[must_use]
pub fn event_db_path(event_dir: &Path) -> Option<PathBuf> {
    event_data_dir(event_dir).map(|dir| dir.join(DATABASE_FILENAME))
}

/// Get the database path for the current working directory.
#[must_use]
pub fn default_db_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    event_db_path(&cwd)
}

/// Readable prefix (last path component) plus a hash of the full path.
///
/// Format: `<event-name>-<hash>` e.g., `spring-10k-a1b2c3d4e5f60718`
fn event_dir_name(event_dir: &Path) -> String {
    let path_to_hash = event_dir.canonicalize().unwrap_or_else(|_| event_dir.to_path_buf());

    let prefix = path_to_hash.file_name().and_then(|n| n.to_str()).unwrap_or("event");
    let prefix: String =
        prefix.chars().map(|c| if c.is_alphanumeric() { c } else { '-' }).collect();
    let prefix = prefix.trim_matches('-');

    let mut hasher = DefaultHasher::new();
    path_to_hash.hash(&mut hasher);

    format!("{prefix}-{:016x}", hasher.finish())
}
