//! cv-history - Conversation state history for Convoy
//!
//! Ships the audit schema for DuckDB and PostgreSQL and an append-only
//! [`HistoryStore`] over DuckDB.

pub mod ddl;
pub mod error;
pub mod store;

pub use ddl::{default_steps, migration_files, MigrationFile};
pub use error::{HistoryError, HistoryResult};
pub use store::HistoryStore;
