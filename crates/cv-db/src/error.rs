//! Error types for cv-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// The database client exited unsuccessfully (D003)
    #[error("[D003] {program} exited with {}: {stderr}", exit_description(.code))]
    ClientExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The database client could not be started (D004)
    #[error("[D004] Failed to start {program}: {source}")]
    ClientSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error talking to the client or reading a file (D005)
    #[error("[D005] IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl DbError {
    /// Exit status reported by an external client, when there is one
    pub fn client_exit_code(&self) -> Option<i32> {
        match self {
            DbError::ClientExit { code, .. } => *code,
            _ => None,
        }
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
