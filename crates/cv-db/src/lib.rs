//! cv-db - Database abstraction layer for Convoy
//!
//! This crate provides the `Database` trait and implementations for DuckDB
//! (embedded) and PostgreSQL (through the `psql` client).

pub mod duckdb;
pub mod error;
pub mod psql;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use psql::{PsqlBackend, PsqlConfig};
pub use traits::Database;
