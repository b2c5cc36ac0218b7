//! Error types for the history store.

use thiserror::Error;

/// History store errors
#[derive(Error, Debug)]
pub enum HistoryError {
    /// The referenced conversation does not exist (H001)
    #[error("[H001] Conversation '{conv_id}' not found")]
    ConversationNotFound { conv_id: String },

    /// A transition was written without a target status (H002)
    #[error("[H002] to_status must not be null (conversation '{conv_id}')")]
    MissingToStatus { conv_id: String },

    /// A history id is already taken (H003)
    #[error("[H003] History id '{history_id}' already exists")]
    DuplicateId { history_id: String },

    /// Metadata could not be encoded or decoded as a JSON object (H004)
    #[error("[H004] Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// A conversation with this id already exists (H005)
    #[error("[H005] Conversation '{conv_id}' already exists")]
    ConversationExists { conv_id: String },

    /// The id generator could not produce a new id (H006)
    #[error("[H006] Failed to generate history id: {0}")]
    IdGeneration(String),

    /// Failed to open the database (H007)
    #[error("[H007] History database connection failed: {0}")]
    ConnectionError(String),

    /// Creating the audit schema failed (H008)
    #[error("[H008] History schema setup failed: {0}")]
    SchemaError(String),

    /// A stored row could not be read back (H009)
    #[error("[H009] Corrupt history row: {0}")]
    CorruptRow(String),

    /// DuckDB driver error with preserved source chain (H010)
    #[error("[H010] History query failed")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`HistoryError`]
pub type HistoryResult<T> = Result<T, HistoryError>;

impl From<duckdb::Error> for HistoryError {
    fn from(err: duckdb::Error) -> Self {
        HistoryError::DuckDb(err)
    }
}
