//! Migration step definitions.
//!
//! A migration plan is an ordered list of steps. Each step names either a
//! single SQL file or a glob over a subdirectory, relative to the migrations
//! root. Globs expand in lexicographic path order at apply time.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

/// One entry of a migration plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StepDef", into = "StepDef")]
pub enum MigrationStep {
    /// A single SQL file
    File(String),
    /// A glob over SQL files, e.g. `roles/*.sql`
    Glob(String),
}

/// YAML shape of a step: exactly one of `file` or `glob`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    glob: Option<String>,
}

impl TryFrom<StepDef> for MigrationStep {
    type Error = CoreError;

    fn try_from(def: StepDef) -> Result<Self, Self::Error> {
        match (def.file, def.glob) {
            (Some(file), None) => Ok(MigrationStep::File(file)),
            (None, Some(glob)) => Ok(MigrationStep::Glob(glob)),
            (Some(_), Some(_)) => Err(CoreError::InvalidStep {
                message: "a step must set either 'file' or 'glob', not both".to_string(),
            }),
            (None, None) => Err(CoreError::InvalidStep {
                message: "a step must set 'file' or 'glob'".to_string(),
            }),
        }
    }
}

impl From<MigrationStep> for StepDef {
    fn from(step: MigrationStep) -> Self {
        match step {
            MigrationStep::File(file) => StepDef {
                file: Some(file),
                glob: None,
            },
            MigrationStep::Glob(glob) => StepDef {
                file: None,
                glob: Some(glob),
            },
        }
    }
}

impl MigrationStep {
    /// Create a single-file step
    pub fn file(path: impl Into<String>) -> Self {
        MigrationStep::File(path.into())
    }

    /// Create a glob step
    pub fn glob(pattern: impl Into<String>) -> Self {
        MigrationStep::Glob(pattern.into())
    }

    /// The raw path or pattern of this step
    pub fn as_str(&self) -> &str {
        match self {
            MigrationStep::File(s) | MigrationStep::Glob(s) => s,
        }
    }

    /// Returns `true` for glob steps
    pub fn is_glob(&self) -> bool {
        matches!(self, MigrationStep::Glob(_))
    }

    /// The plan the platform's migration image has always applied:
    /// numbered top-level files with the `roles/` and `feature/` globs
    /// interleaved.
    pub fn default_plan() -> Vec<MigrationStep> {
        vec![
            MigrationStep::file("001_reset_schema.sql"),
            MigrationStep::file("002_conversations.sql"),
            MigrationStep::file("003_conversation_state_history.sql"),
            MigrationStep::glob("roles/*.sql"),
            MigrationStep::file("004_history_indexes.sql"),
            MigrationStep::glob("feature/*.sql"),
        ]
    }

    /// Check that the step stays inside the migrations root and that glob
    /// patterns compile.
    pub fn validate(&self) -> CoreResult<()> {
        let raw = self.as_str();
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidStep {
                message: "step path must not be empty".to_string(),
            });
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            return Err(CoreError::InvalidStep {
                message: format!("'{}' must be relative to the migrations directory", raw),
            });
        }
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(CoreError::InvalidStep {
                message: format!("'{}' must not leave the migrations directory", raw),
            });
        }

        if let MigrationStep::Glob(pattern) = self {
            glob::Pattern::new(pattern).map_err(|e| CoreError::InvalidGlob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::File(path) => write!(f, "{}", path),
            MigrationStep::Glob(pattern) => write!(f, "{} (glob)", pattern),
        }
    }
}
