//! Configuration types and parsing for convoy.yml

use crate::error::{CoreError, CoreResult};
use crate::step::MigrationStep;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Config file names probed in the migrations directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["convoy.yml", "convoy.yaml"];

/// Main configuration from convoy.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Ordered migration steps. Empty means the default plan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<MigrationStep>,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Named target configurations (e.g., dev, prod)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Step list override
    #[serde(default)]
    pub steps: Option<Vec<MigrationStep>>,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// Embedded DuckDB (default)
    #[default]
    DuckDb,
    /// PostgreSQL, driven through the `psql` client
    Postgres,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Postgres => write!(f, "postgres"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type (duckdb or postgres)
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database file path for DuckDB (or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,

    /// PostgreSQL role to connect as
    #[serde(default)]
    pub user: Option<String>,

    /// PostgreSQL database name
    #[serde(default)]
    pub name: Option<String>,

    /// PostgreSQL host (socket connection when unset)
    #[serde(default)]
    pub host: Option<String>,

    /// PostgreSQL port
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
            user: None,
            name: None,
            host: None,
            port: None,
        }
    }
}

const DEFAULT_DB_PATH: &str = ":memory:";

const DEFAULT_PROJECT_NAME: &str = "convoy";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROJECT_NAME.to_string(),
            steps: Vec::new(),
            database: DatabaseConfig::default(),
            targets: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a migrations directory.
    /// Looks for convoy.yml or convoy.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        Err(CoreError::ConfigNotFound {
            path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
        })
    }

    /// Load from a directory, falling back to [`Config::default`] when the
    /// directory carries no config file.
    pub fn load_from_dir_or_default(dir: &Path) -> CoreResult<Self> {
        match Self::load_from_dir(dir) {
            Err(CoreError::ConfigNotFound { .. }) => {
                log::debug!(
                    "No config file in {}, using the default migration plan",
                    dir.display()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        for step in &self.steps {
            step.validate()?;
        }

        for (name, target) in &self.targets {
            if let Some(steps) = &target.steps {
                if steps.is_empty() {
                    return Err(CoreError::ConfigInvalid {
                        message: format!("Target '{}' overrides steps with an empty list", name),
                    });
                }
                for step in steps {
                    step.validate()?;
                }
            }
        }

        Ok(())
    }

    /// Get the list of available target names, sorted
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn target(&self, name: &str) -> CoreResult<&TargetConfig> {
        self.targets.get(name).ok_or_else(|| CoreError::UnknownTarget {
            name: name.to_string(),
            available: if self.targets.is_empty() {
                "(none)".to_string()
            } else {
                self.available_targets().join(", ")
            },
        })
    }

    /// Resolve the database configuration for an optional target
    pub fn database_for(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => Ok(self
                .target(name)?
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone())),
            None => Ok(self.database.clone()),
        }
    }

    /// Resolve the ordered migration steps for an optional target.
    ///
    /// Falls back to [`MigrationStep::default_plan`] when neither the target
    /// nor the base config lists any steps.
    pub fn steps_for(&self, target: Option<&str>) -> CoreResult<Vec<MigrationStep>> {
        if let Some(name) = target {
            if let Some(steps) = &self.target(name)?.steps {
                return Ok(steps.clone());
            }
        }
        if self.steps.is_empty() {
            Ok(MigrationStep::default_plan())
        } else {
            Ok(self.steps.clone())
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
