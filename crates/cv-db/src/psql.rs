//! PostgreSQL backend driven through the `psql` client.
//!
//! Every call spawns one `psql` process with `ON_ERROR_STOP=1`, so a file
//! stops at its first failing statement and the client exits non-zero. The
//! exit status is kept on the error so callers can propagate it.

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Default client executable
pub const DEFAULT_PSQL_PROGRAM: &str = "psql";

/// Connection settings for [`PsqlBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsqlConfig {
    /// Client executable
    pub program: PathBuf,

    /// `--username`
    pub user: Option<String>,

    /// `--dbname`
    pub dbname: Option<String>,

    /// `--host`
    pub host: Option<String>,

    /// `--port`
    pub port: Option<u16>,
}

impl Default for PsqlConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PSQL_PROGRAM),
            user: None,
            dbname: None,
            host: None,
            port: None,
        }
    }
}

/// PostgreSQL backend that shells out to `psql`
pub struct PsqlBackend {
    config: PsqlConfig,
}

/// Where a psql invocation reads its SQL from
#[derive(Clone, Copy)]
enum Input<'a> {
    File(&'a Path),
    Stdin(&'a str),
    Command(&'a str),
}

impl PsqlBackend {
    /// Create a backend from connection settings
    pub fn new(config: PsqlConfig) -> Self {
        Self { config }
    }

    /// Connection settings
    pub fn config(&self) -> &PsqlConfig {
        &self.config
    }

    fn program_name(&self) -> String {
        self.config.program.display().to_string()
    }

    /// Arguments shared by every invocation
    pub fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            "ON_ERROR_STOP=1".to_string(),
            "--no-psqlrc".to_string(),
            "--quiet".to_string(),
        ];
        if let Some(user) = &self.config.user {
            args.push("--username".to_string());
            args.push(user.clone());
        }
        if let Some(dbname) = &self.config.dbname {
            args.push("--dbname".to_string());
            args.push(dbname.clone());
        }
        if let Some(host) = &self.config.host {
            args.push("--host".to_string());
            args.push(host.clone());
        }
        if let Some(port) = self.config.port {
            args.push("--port".to_string());
            args.push(port.to_string());
        }
        args
    }

    fn args_for(&self, input: &Input<'_>) -> Vec<String> {
        let mut args = self.base_args();
        match input {
            Input::File(path) => {
                args.push("-f".to_string());
                args.push(path.display().to_string());
            }
            Input::Stdin(_) => {
                args.push("-f".to_string());
                args.push("-".to_string());
            }
            Input::Command(sql) => {
                args.push("--tuples-only".to_string());
                args.push("--no-align".to_string());
                args.push("-c".to_string());
                args.push(sql.to_string());
            }
        }
        args
    }

    async fn run(&self, input: Input<'_>) -> DbResult<Output> {
        let program = self.program_name();
        let args = self.args_for(&input);
        log::debug!("Running {} {}", program, args.join(" "));

        let mut command = Command::new(&self.config.program);
        command
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(match input {
                Input::Stdin(_) => Stdio::piped(),
                _ => Stdio::null(),
            });

        let mut child = command.spawn().map_err(|e| DbError::ClientSpawn {
            program: program.clone(),
            source: e,
        })?;

        let output = match (input, child.stdin.take()) {
            (Input::Stdin(sql), Some(mut stdin)) => {
                let feed = async move {
                    let result = stdin.write_all(sql.as_bytes()).await;
                    drop(stdin);
                    result
                };
                let (fed, output) = tokio::join!(feed, child.wait_with_output());
                // A client that exits early closes its stdin; its exit status
                // is the meaningful result then.
                if let Err(e) = fed {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(DbError::Io {
                            path: format!("{} stdin", program),
                            source: e,
                        });
                    }
                }
                output
            }
            _ => child.wait_with_output().await,
        }
        .map_err(|e| DbError::Io {
            path: program.clone(),
            source: e,
        })?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(DbError::ClientExit {
                program,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl Database for PsqlBackend {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.run(Input::Stdin(sql)).await.map(|_| ())
    }

    async fn execute_file(&self, path: &Path) -> DbResult<()> {
        self.run(Input::File(path)).await.map(|_| ())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let sql = format!(
            "SELECT to_regclass('{}') IS NOT NULL",
            name.replace('\'', "''")
        );
        let output = self.run(Input::Command(&sql)).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim() == "t")
    }

    fn db_type(&self) -> &'static str {
        "postgres"
    }

    fn describe(&self) -> String {
        format!(
            "postgres ({}@{})",
            self.config.user.as_deref().unwrap_or("<default user>"),
            self.config.dbname.as_deref().unwrap_or("<default db>")
        )
    }
}

#[cfg(test)]
#[path = "psql_test.rs"]
mod tests;
