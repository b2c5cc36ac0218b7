//! Error types for cv-migrate

use cv_core::CoreError;
use cv_db::DbError;
use thiserror::Error;

/// Migration applier errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A migration file failed; nothing after it was executed (M001)
    #[error("[M001] Migration {path} failed: {source}")]
    StepFailed {
        path: String,
        #[source]
        source: DbError,
    },

    /// The migrations directory does not exist (M002)
    #[error("[M002] Migrations directory not found: {path}")]
    RootNotFound { path: String },

    /// A glob step could not be expanded (M003)
    #[error("[M003] Failed to expand '{pattern}': {message}")]
    GlobFailed { pattern: String, message: String },

    /// The plan itself is invalid (M004)
    #[error("[M004] Invalid migration plan: {0}")]
    InvalidPlan(#[from] CoreError),
}

impl MigrateError {
    /// Exit status of the database client behind a failed step, if any
    pub fn client_exit_code(&self) -> Option<i32> {
        match self {
            MigrateError::StepFailed { source, .. } => source.client_exit_code(),
            _ => None,
        }
    }
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;
