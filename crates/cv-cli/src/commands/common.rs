//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use cv_core::config::CONFIG_FILE_NAMES;
use cv_core::{Config, DatabaseConfig, DbType};
use cv_db::{Database, DuckDbBackend, PsqlBackend, PsqlConfig};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::{Backend, ConnectionArgs, GlobalArgs};

/// DuckDB path that names a throwaway in-memory database
pub(crate) const IN_MEMORY_DB: &str = ":memory:";

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command already reported the failure.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

impl From<Backend> for DbType {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Duckdb => DbType::DuckDb,
            Backend::Postgres => DbType::Postgres,
        }
    }
}

/// Print a `[verbose]` line when verbose output is enabled
pub(crate) fn verbose(global: &GlobalArgs, msg: impl AsRef<str>) {
    if global.verbose {
        eprintln!("[verbose] {}", msg.as_ref());
    }
}

/// Migrations root from the global arguments
pub(crate) fn migrations_root(global: &GlobalArgs) -> PathBuf {
    PathBuf::from(&global.dir)
}

/// Load `--config`, or the config file in the migrations root, or the
/// defaults when the root carries none.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    match &global.config {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load configuration file {path}")),
        None => Config::load_from_dir_or_default(&migrations_root(global))
            .context("Failed to load migration configuration"),
    }
}

/// Whether `--config` was given or the migrations root carries a config file
pub(crate) fn has_config_file(global: &GlobalArgs) -> bool {
    let root = migrations_root(global);
    global.config.is_some() || CONFIG_FILE_NAMES.iter().any(|name| root.join(name).is_file())
}

/// Database settings for the selected target with command-line (and
/// environment) overrides applied on top.
///
/// Without a config file and without `--backend`, PostgreSQL connection
/// settings (e.g. `POSTGRES_USER` or `POSTGRES_DB`) select PostgreSQL.
pub(crate) fn resolve_database(
    config: &Config,
    target: Option<&str>,
    overrides: &ConnectionArgs,
    configured: bool,
) -> Result<DatabaseConfig> {
    let mut db = config.database_for(target)?;

    if let Some(backend) = overrides.backend {
        db.db_type = backend.into();
    } else if !configured && (overrides.user.is_some() || overrides.dbname.is_some()) {
        db.db_type = DbType::Postgres;
    }
    if let Some(path) = &overrides.database {
        db.path = path.clone();
    }
    if overrides.user.is_some() {
        db.user = overrides.user.clone();
    }
    if overrides.dbname.is_some() {
        db.name = overrides.dbname.clone();
    }
    if overrides.host.is_some() {
        db.host = overrides.host.clone();
    }
    if overrides.port.is_some() {
        db.port = overrides.port;
    }

    Ok(db)
}

/// Connect to the database described by `db`
pub(crate) fn build_backend(db: &DatabaseConfig, psql: &str) -> Result<Box<dyn Database>> {
    match db.db_type {
        DbType::DuckDb => {
            let backend = DuckDbBackend::new(&db.path)
                .with_context(|| format!("Failed to open DuckDB database {}", db.path))?;
            Ok(Box::new(backend))
        }
        DbType::Postgres => Ok(Box::new(PsqlBackend::new(PsqlConfig {
            program: PathBuf::from(psql),
            user: db.user.clone(),
            dbname: db.name.clone(),
            host: db.host.clone(),
            port: db.port,
        }))),
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
