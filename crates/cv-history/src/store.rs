//! DuckDB-backed conversation state history.
//!
//! [`HistoryStore`] owns a DuckDB [`Connection`] with the audit schema
//! applied. DuckDB has no triggers and no `ON DELETE CASCADE`, so the two
//! rules the PostgreSQL schema enforces in the database live here instead:
//! a missing `history_id` is filled with a fresh ULID on append, and
//! deleting a conversation removes its history rows first.

use crate::ddl::STORE_SCHEMA;
use crate::error::{HistoryError, HistoryResult};
use chrono::{DateTime, Utc};
use cv_core::{ActorType, ConversationId, HistoryEntry, HistoryId, NewTransition};
use duckdb::Connection;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Mutex;
use ulid::Generator;

const SELECT_COLUMNS: &str = "history_id, conv_id, from_status, to_status, actor_type, \
     actor_id, reason, metadata, epoch_ms(created_at)";

/// Conversation state history on a single DuckDB connection.
///
/// Single-owner: the connection is not shared between threads.
pub struct HistoryStore {
    conn: Connection,
    ids: Mutex<Generator>,
}

impl HistoryStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> HistoryResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| HistoryError::ConnectionError(format!("{e}: {}", path.display())))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store with the schema applied.
    pub fn open_memory() -> HistoryResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| HistoryError::ConnectionError(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> HistoryResult<Self> {
        for sql in STORE_SCHEMA {
            conn.execute_batch(sql)
                .map_err(|e| HistoryError::SchemaError(e.to_string()))?;
        }
        Ok(Self {
            conn,
            ids: Mutex::new(Generator::new()),
        })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert a conversation row with the given status.
    pub fn create_conversation(&self, conv_id: &ConversationId, status: &str) -> HistoryResult<()> {
        if self.conversation_exists(conv_id)? {
            return Err(HistoryError::ConversationExists {
                conv_id: conv_id.to_string(),
            });
        }
        self.conn.execute(
            "INSERT INTO conversations (conv_id, status) VALUES (?, ?)",
            duckdb::params![conv_id.as_str(), status],
        )?;
        log::debug!("Created conversation {} ({})", conv_id, status);
        Ok(())
    }

    /// Returns `true` when the conversation row exists.
    pub fn conversation_exists(&self, conv_id: &ConversationId) -> HistoryResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE conv_id = ?",
            duckdb::params![conv_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Append one transition and return the stored row.
    ///
    /// A missing `history_id` is generated; a missing `created_at` becomes
    /// the current time. Existing rows are never touched.
    pub fn append(&self, transition: NewTransition) -> HistoryResult<HistoryEntry> {
        let NewTransition {
            history_id,
            conv_id,
            from_status,
            to_status,
            actor_type,
            actor_id,
            reason,
            metadata,
            created_at,
        } = transition;

        let to_status = to_status.ok_or_else(|| HistoryError::MissingToStatus {
            conv_id: conv_id.to_string(),
        })?;

        if !self.conversation_exists(&conv_id)? {
            return Err(HistoryError::ConversationNotFound {
                conv_id: conv_id.to_string(),
            });
        }

        let history_id = match history_id {
            Some(id) => {
                if self.get(&id)?.is_some() {
                    return Err(HistoryError::DuplicateId {
                        history_id: id.into_inner(),
                    });
                }
                id
            }
            None => self.next_id()?,
        };

        let metadata = serde_json::to_string(&Value::Object(metadata))
            .map_err(|e| HistoryError::InvalidMetadata(e.to_string()))?;
        let created_ms = created_at.unwrap_or_else(Utc::now).timestamp_millis();

        self.conn
            .execute(
                "INSERT INTO conversation_state_history \
                 (history_id, conv_id, from_status, to_status, actor_type, actor_id, reason, metadata, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, epoch_ms(CAST(? AS BIGINT)))",
                duckdb::params![
                    history_id.as_str(),
                    conv_id.as_str(),
                    from_status.as_deref(),
                    to_status.as_str(),
                    actor_type.as_str(),
                    actor_id.as_deref(),
                    reason.as_deref(),
                    metadata,
                    created_ms,
                ],
            )
            .map_err(|e| classify_insert_error(e, &conv_id, &history_id))?;

        log::debug!(
            "Recorded {} -> {} for conversation {} ({})",
            from_status.as_deref().unwrap_or("<none>"),
            to_status,
            conv_id,
            history_id
        );

        self.get(&history_id)?.ok_or_else(|| {
            HistoryError::CorruptRow(format!("history row {history_id} missing after insert"))
        })
    }

    /// Fetch a single row by id.
    pub fn get(&self, history_id: &HistoryId) -> HistoryResult<Option<HistoryEntry>> {
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM conversation_state_history WHERE history_id = ?");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(duckdb::params![history_id.as_str()], read_raw)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw?.into_entry()?)),
            None => Ok(None),
        }
    }

    /// Every row of a conversation, oldest first.
    ///
    /// Rows sharing a `created_at` are ordered by `history_id`.
    pub fn history_for(&self, conv_id: &ConversationId) -> HistoryResult<Vec<HistoryEntry>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM conversation_state_history \
             WHERE conv_id = ? ORDER BY created_at, history_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raws = stmt
            .query_map(duckdb::params![conv_id.as_str()], read_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawRow::into_entry).collect()
    }

    /// Most recent row of a conversation.
    pub fn latest_for(&self, conv_id: &ConversationId) -> HistoryResult<Option<HistoryEntry>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM conversation_state_history \
             WHERE conv_id = ? ORDER BY created_at DESC, history_id DESC LIMIT 1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(duckdb::params![conv_id.as_str()], read_raw)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw?.into_entry()?)),
            None => Ok(None),
        }
    }

    /// Number of rows recorded for a conversation.
    pub fn count_for(&self, conv_id: &ConversationId) -> HistoryResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM conversation_state_history WHERE conv_id = ?",
            duckdb::params![conv_id.as_str()],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| HistoryError::CorruptRow(format!("negative row count {count}")))
    }

    /// Delete a conversation together with its history.
    ///
    /// History rows go first, then the conversation row. Returns the number
    /// of history rows removed.
    pub fn delete_conversation(&self, conv_id: &ConversationId) -> HistoryResult<usize> {
        if !self.conversation_exists(conv_id)? {
            return Err(HistoryError::ConversationNotFound {
                conv_id: conv_id.to_string(),
            });
        }

        let removed = self.conn.execute(
            "DELETE FROM conversation_state_history WHERE conv_id = ?",
            duckdb::params![conv_id.as_str()],
        )?;
        self.conn.execute(
            "DELETE FROM conversations WHERE conv_id = ?",
            duckdb::params![conv_id.as_str()],
        )?;

        log::debug!(
            "Deleted conversation {} and {} history row(s)",
            conv_id,
            removed
        );
        Ok(removed)
    }

    fn next_id(&self) -> HistoryResult<HistoryId> {
        let mut generator = self
            .ids
            .lock()
            .map_err(|e| HistoryError::IdGeneration(format!("generator lock poisoned: {e}")))?;
        let ulid = generator
            .generate()
            .map_err(|e| HistoryError::IdGeneration(e.to_string()))?;
        HistoryId::parse(ulid.to_string()).map_err(|e| HistoryError::IdGeneration(e.to_string()))
    }
}

/// Column values as stored, before validation.
struct RawRow {
    history_id: String,
    conv_id: String,
    from_status: Option<String>,
    to_status: String,
    actor_type: String,
    actor_id: Option<String>,
    reason: Option<String>,
    metadata: String,
    created_ms: i64,
}

fn read_raw(row: &duckdb::Row<'_>) -> duckdb::Result<RawRow> {
    Ok(RawRow {
        history_id: row.get(0)?,
        conv_id: row.get(1)?,
        from_status: row.get(2)?,
        to_status: row.get(3)?,
        actor_type: row.get(4)?,
        actor_id: row.get(5)?,
        reason: row.get(6)?,
        metadata: row.get(7)?,
        created_ms: row.get(8)?,
    })
}

impl RawRow {
    fn into_entry(self) -> HistoryResult<HistoryEntry> {
        let history_id = HistoryId::parse(self.history_id)
            .map_err(|e| HistoryError::CorruptRow(e.to_string()))?;
        let conv_id = ConversationId::parse(self.conv_id)
            .map_err(|e| HistoryError::CorruptRow(format!("{history_id}: {e}")))?;
        let actor_type: ActorType = self
            .actor_type
            .parse()
            .map_err(|e| HistoryError::CorruptRow(format!("{history_id}: {e}")))?;
        let metadata = parse_metadata(&self.metadata)?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_ms).ok_or_else(|| {
            HistoryError::CorruptRow(format!(
                "{history_id}: created_at {} out of range",
                self.created_ms
            ))
        })?;

        Ok(HistoryEntry {
            history_id,
            conv_id,
            from_status: self.from_status,
            to_status: self.to_status,
            actor_type,
            actor_id: self.actor_id,
            reason: self.reason,
            metadata,
            created_at,
        })
    }
}

fn parse_metadata(raw: &str) -> HistoryResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(HistoryError::InvalidMetadata(format!(
            "expected a JSON object, found {other}"
        ))),
        Err(e) => Err(HistoryError::InvalidMetadata(e.to_string())),
    }
}

/// Map constraint failures the pre-checks can race with onto their errors.
fn classify_insert_error(
    err: duckdb::Error,
    conv_id: &ConversationId,
    history_id: &HistoryId,
) -> HistoryError {
    let message = err.to_string();
    if message.contains("foreign key") {
        HistoryError::ConversationNotFound {
            conv_id: conv_id.to_string(),
        }
    } else if message.contains("Duplicate key") || message.contains("primary key") {
        HistoryError::DuplicateId {
            history_id: history_id.to_string(),
        }
    } else {
        HistoryError::DuckDb(err)
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
