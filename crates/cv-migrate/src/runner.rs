//! Sequential, fail-fast migration applier.
//!
//! Steps run strictly in order and each file completes before the next one
//! starts. A glob is expanded only when the applier reaches it. Missing files
//! and empty globs produce a warning and are skipped; the first failing file
//! aborts the run and nothing after it is executed. Files that were already
//! applied are not rolled back.

use crate::error::{MigrateError, MigrateResult};
use crate::plan::{ensure_root, resolve_step, PlannedFile};
use cv_core::MigrationStep;
use cv_db::{Database, DbError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Progress notifications emitted while applying
#[derive(Debug)]
pub enum StepEvent<'a> {
    /// A file is about to be executed
    Starting { file: &'a PlannedFile },
    /// A file executed successfully
    Applied {
        file: &'a PlannedFile,
        duration: Duration,
    },
    /// A listed file does not exist and was skipped
    Missing { file: &'a PlannedFile },
    /// A glob step matched no files
    EmptyGlob { pattern: &'a str },
    /// A file failed; the run stops after this event
    Failed {
        file: &'a PlannedFile,
        error: &'a DbError,
    },
}

/// Outcome of one visited file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileStatus {
    /// Executed successfully
    Applied { duration_ms: u64 },
    /// Not found, skipped with a warning
    Missing,
}

/// One line of the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// Path relative to the migrations root
    pub relative: PathBuf,

    /// What happened
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Result of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// Per-file outcomes in execution order
    pub outcomes: Vec<FileOutcome>,

    /// Glob patterns that matched nothing
    pub empty_globs: Vec<String>,

    /// Wall-clock time of the whole run in milliseconds
    pub elapsed_ms: u64,
}

impl ApplyReport {
    /// Number of files executed
    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::Applied { .. }))
            .count()
    }

    /// Number of listed files that were not found
    pub fn missing_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == FileStatus::Missing)
            .count()
    }

    /// Returns `true` when anything produced a warning
    pub fn has_warnings(&self) -> bool {
        self.missing_count() > 0 || !self.empty_globs.is_empty()
    }
}

/// Applies an ordered list of steps under a migrations root
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    root: PathBuf,
    steps: Vec<MigrationStep>,
}

impl MigrationRunner {
    /// Create a runner for `steps` relative to `root`
    pub fn new(root: impl Into<PathBuf>, steps: Vec<MigrationStep>) -> Self {
        Self {
            root: root.into(),
            steps,
        }
    }

    /// Migrations root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configured steps
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Apply every step against `db`, calling `on_event` as files progress.
    pub async fn apply<F>(&self, db: &dyn Database, mut on_event: F) -> MigrateResult<ApplyReport>
    where
        F: FnMut(&StepEvent<'_>),
    {
        ensure_root(&self.root)?;
        for step in &self.steps {
            step.validate()?;
        }

        log::info!(
            "Applying {} migration step(s) from {} to {}",
            self.steps.len(),
            self.root.display(),
            db.describe()
        );

        let started = Instant::now();
        let mut report = ApplyReport::default();

        for (index, step) in self.steps.iter().enumerate() {
            let resolved = resolve_step(&self.root, index, step)?;

            if step.is_glob() && resolved.is_empty_glob() {
                log::warn!("No files match {}, skipping", step.as_str());
                on_event(&StepEvent::EmptyGlob {
                    pattern: step.as_str(),
                });
                report.empty_globs.push(step.as_str().to_string());
                continue;
            }

            for file in &resolved.files {
                // Checked when the file is reached, not when the step resolved.
                if !file.path.is_file() {
                    log::warn!("Migration file {} not found, skipping", file.path.display());
                    on_event(&StepEvent::Missing { file });
                    report.outcomes.push(FileOutcome {
                        relative: file.relative.clone(),
                        status: FileStatus::Missing,
                    });
                    continue;
                }

                on_event(&StepEvent::Starting { file });
                let file_started = Instant::now();

                if let Err(error) = db.execute_file(&file.path).await {
                    log::error!("Migration {} failed: {}", file.relative.display(), error);
                    on_event(&StepEvent::Failed {
                        file,
                        error: &error,
                    });
                    return Err(MigrateError::StepFailed {
                        path: file.relative.display().to_string(),
                        source: error,
                    });
                }

                let duration = file_started.elapsed();
                log::info!(
                    "Applied {} in {}ms",
                    file.relative.display(),
                    duration.as_millis()
                );
                on_event(&StepEvent::Applied { file, duration });
                report.outcomes.push(FileOutcome {
                    relative: file.relative.clone(),
                    status: FileStatus::Applied {
                        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    },
                });
            }
        }

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(report)
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
