//! Database trait definition

use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use std::path::Path;

/// Database abstraction trait for Convoy
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute multiple SQL statements, stopping at the first failing one
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Execute every statement of a SQL file, stopping at the first failing one
    async fn execute_file(&self, path: &Path) -> DbResult<()> {
        let sql = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DbError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        self.execute_batch(&sql).await
    }

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Human-readable connection description for logging
    fn describe(&self) -> String {
        self.db_type().to_string()
    }
}
