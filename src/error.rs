//! Error types for `race_checklist`.

/// Errors that can occur while reading or mutating the checklist.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A `SQLite` database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A template error occurred.
    #[error("Template error: {0}")]
    Template(String),

    /// Input was rejected before any write was issued.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation needs the admin capability.
    #[error("Admin access required to {0}")]
    AdminRequired(String),

    /// A viewer tried to mark a completed task incomplete.
    #[error("Task {0} is complete; only an admin can reopen it")]
    CompletionLocked(String),

    /// The store needs an index that is still being built.
    #[error("Query index not ready yet, try again shortly: {0}")]
    IndexNotReady(String),

    /// The store cannot be reached at all.
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    /// A multi-document operation stopped part way through.
    #[error("{intent} stopped after {applied} of {total} steps: {source}")]
    PartialApply {
        /// Description of the operation.
        intent: String,
        /// Steps written before the failure.
        applied: usize,
        /// Total number of steps in the plan.
        total: usize,
        /// The error from the failing step.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether a refresh should keep polling and try again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::IndexNotReady(_))
    }

    /// Whether the store is gone entirely, so rendering must halt.
    #[must_use]
    pub fn is_connectivity_loss(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) => true,
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::NotADatabase
                    | rusqlite::ErrorCode::DatabaseCorrupt
                    | rusqlite::ErrorCode::PermissionDenied
            ),
            Self::PartialApply { source, .. } => source.is_connectivity_loss(),
            _ => false,
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_not_ready_is_retryable() {
        let err = Error::IndexNotReady("race_tasks(category, sort_order)".to_string());
        assert!(err.is_retryable());
        assert!(!err.is_connectivity_loss());
        assert!(err.to_string().contains("try again"));
    }

    #[test]
    fn test_store_unavailable_is_connectivity_loss() {
        let err = Error::StoreUnavailable("connection refused".to_string());
        assert!(err.is_connectivity_loss());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cannot_open_database_is_connectivity_loss() {
        let err = Error::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            None,
        ));
        assert!(err.is_connectivity_loss());
    }

    #[test]
    fn test_partial_apply_inherits_classification() {
        let err = Error::PartialApply {
            intent: "swap".to_string(),
            applied: 1,
            total: 2,
            source: Box::new(Error::StoreUnavailable("down".to_string())),
        };
        assert!(err.is_connectivity_loss());
        assert!(err.to_string().contains("after 1 of 2 steps"));
    }

    #[test]
    fn test_completion_locked_message() {
        let err = Error::CompletionLocked("radios-0001".to_string());
        assert!(err.to_string().contains("only an admin"));
    }
}
