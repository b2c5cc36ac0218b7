//! Embedded migration files for the conversation audit schema.
//!
//! Each dialect ships the same numbered layout the default plan expects.
//! `cv init` writes these files to disk; [`crate::HistoryStore`] runs the
//! DuckDB table and index files directly when it opens a database.

use cv_core::{DbType, MigrationStep};

/// A migration file bundled with the binary
#[derive(Debug, Clone, Copy)]
pub struct MigrationFile {
    /// Path relative to the migrations root
    pub path: &'static str,
    /// Raw SQL
    pub sql: &'static str,
}

static DUCKDB_FILES: &[MigrationFile] = &[
    MigrationFile {
        path: "001_reset_schema.sql",
        sql: include_str!("duckdb/001_reset_schema.sql"),
    },
    MigrationFile {
        path: "002_conversations.sql",
        sql: include_str!("duckdb/002_conversations.sql"),
    },
    MigrationFile {
        path: "003_conversation_state_history.sql",
        sql: include_str!("duckdb/003_conversation_state_history.sql"),
    },
    MigrationFile {
        path: "004_history_indexes.sql",
        sql: include_str!("duckdb/004_history_indexes.sql"),
    },
    MigrationFile {
        path: "feature/001_conversation_latest_status.sql",
        sql: include_str!("duckdb/feature/001_conversation_latest_status.sql"),
    },
];

static POSTGRES_FILES: &[MigrationFile] = &[
    MigrationFile {
        path: "001_reset_schema.sql",
        sql: include_str!("postgres/001_reset_schema.sql"),
    },
    MigrationFile {
        path: "002_conversations.sql",
        sql: include_str!("postgres/002_conversations.sql"),
    },
    MigrationFile {
        path: "003_conversation_state_history.sql",
        sql: include_str!("postgres/003_conversation_state_history.sql"),
    },
    MigrationFile {
        path: "roles/001_app_roles.sql",
        sql: include_str!("postgres/roles/001_app_roles.sql"),
    },
    MigrationFile {
        path: "004_history_indexes.sql",
        sql: include_str!("postgres/004_history_indexes.sql"),
    },
    MigrationFile {
        path: "feature/001_conversation_latest_status.sql",
        sql: include_str!("postgres/feature/001_conversation_latest_status.sql"),
    },
];

/// Files that create the store's tables without dropping anything.
pub(crate) static STORE_SCHEMA: &[&str] = &[
    include_str!("duckdb/002_conversations.sql"),
    include_str!("duckdb/003_conversation_state_history.sql"),
    include_str!("duckdb/004_history_indexes.sql"),
];

/// Bundled migration files for `dialect`, in plan order.
pub fn migration_files(dialect: DbType) -> &'static [MigrationFile] {
    match dialect {
        DbType::DuckDb => DUCKDB_FILES,
        DbType::Postgres => POSTGRES_FILES,
    }
}

/// Plan that applies the bundled files for `dialect`.
///
/// DuckDB has no roles, so its plan leaves out the `roles/*.sql` glob.
pub fn default_steps(dialect: DbType) -> Vec<MigrationStep> {
    let plan = MigrationStep::default_plan();
    match dialect {
        DbType::Postgres => plan,
        DbType::DuckDb => plan
            .into_iter()
            .filter(|step| step.as_str() != "roles/*.sql")
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_files_follow_default_plan() {
        let paths: Vec<&str> = migration_files(DbType::Postgres)
            .iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "001_reset_schema.sql",
                "002_conversations.sql",
                "003_conversation_state_history.sql",
                "roles/001_app_roles.sql",
                "004_history_indexes.sql",
                "feature/001_conversation_latest_status.sql",
            ]
        );
    }

    #[test]
    fn test_postgres_history_table_has_id_trigger() {
        let sql = migration_files(DbType::Postgres)[2].sql;
        assert!(sql.contains("CREATE OR REPLACE FUNCTION generate_ulid()"));
        assert!(sql.contains("CREATE TRIGGER trg_conversation_state_history_id"));
        assert!(sql.contains("BEFORE INSERT ON conversation_state_history"));
        assert!(sql.contains("ON DELETE CASCADE"));
    }

    #[test]
    fn test_duckdb_plan_has_no_roles() {
        let steps = default_steps(DbType::DuckDb);
        assert!(steps.iter().all(|s| !s.as_str().starts_with("roles/")));
        assert!(migration_files(DbType::DuckDb)
            .iter()
            .all(|f| !f.path.starts_with("roles/")));
        assert_eq!(default_steps(DbType::Postgres), MigrationStep::default_plan());
    }

    #[test]
    fn test_duckdb_reset_drops_child_first() {
        let sql = migration_files(DbType::DuckDb)[0].sql;
        let child = sql.find("DROP TABLE IF EXISTS conversation_state_history").unwrap();
        let parent = sql.find("DROP TABLE IF EXISTS conversations").unwrap();
        assert!(child < parent);
    }
}
