//! Resolution of migration steps into concrete files.
//!
//! File steps resolve to exactly one entry, present or not. Glob steps
//! resolve to every matching regular file, sorted by path; a glob with no
//! matches resolves to nothing and is reported separately.

use crate::error::{MigrateError, MigrateResult};
use cv_core::MigrationStep;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One file the applier will visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    /// Index of the step this file came from
    pub step_index: usize,

    /// Path relative to the migrations root
    pub relative: PathBuf,

    /// Absolute (root-joined) path
    pub path: PathBuf,

    /// Whether the file exists when the plan was resolved
    pub present: bool,

    /// Whether the file came from a glob step
    pub from_glob: bool,
}

/// Resolution of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStep {
    /// Position in the plan
    pub index: usize,

    /// The step as configured
    pub step: String,

    /// Files in execution order
    pub files: Vec<PlannedFile>,
}

impl ResolvedStep {
    /// Returns `true` for a glob step that matched nothing
    pub fn is_empty_glob(&self) -> bool {
        self.files.is_empty()
    }
}

/// Fail unless `root` is an existing directory
pub fn ensure_root(root: &Path) -> MigrateResult<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(MigrateError::RootNotFound {
            path: root.display().to_string(),
        })
    }
}

/// Resolve a single step against `root`.
pub fn resolve_step(root: &Path, index: usize, step: &MigrationStep) -> MigrateResult<ResolvedStep> {
    step.validate()?;

    let files = match step {
        MigrationStep::File(file) => {
            let path = root.join(file);
            vec![PlannedFile {
                step_index: index,
                relative: PathBuf::from(file),
                present: path.is_file(),
                path,
                from_glob: false,
            }]
        }
        MigrationStep::Glob(pattern) => expand_glob(root, index, pattern)?,
    };

    Ok(ResolvedStep {
        index,
        step: step.to_string(),
        files,
    })
}

/// Resolve a whole plan without touching any database.
pub fn resolve_plan(root: &Path, steps: &[MigrationStep]) -> MigrateResult<Vec<ResolvedStep>> {
    ensure_root(root)?;
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| resolve_step(root, index, step))
        .collect()
}

fn expand_glob(root: &Path, index: usize, pattern: &str) -> MigrateResult<Vec<PlannedFile>> {
    let root_str = root.to_str().ok_or_else(|| MigrateError::GlobFailed {
        pattern: pattern.to_string(),
        message: format!("migrations directory {} is not valid UTF-8", root.display()),
    })?;
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(root_str.trim_end_matches('/')),
        pattern
    );

    let entries = glob::glob(&full_pattern).map_err(|e| MigrateError::GlobFailed {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| MigrateError::GlobFailed {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    log::debug!("Glob '{}' matched {} file(s)", pattern, paths.len());

    Ok(paths
        .into_iter()
        .map(|path| PlannedFile {
            step_index: index,
            relative: path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
            path,
            present: true,
            from_glob: true,
        })
        .collect())
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
