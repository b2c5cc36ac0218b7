//! Error types for cv-core

use thiserror::Error;

/// Core error type for Convoy
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Unknown target name
    #[error("[C004] Unknown target '{name}'. Available targets: {available}")]
    UnknownTarget { name: String, available: String },

    /// C005: Migration step is malformed
    #[error("[C005] Invalid migration step: {message}")]
    InvalidStep { message: String },

    /// C006: Glob pattern could not be compiled
    #[error("[C006] Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// C007: Actor type outside the allowed set
    #[error("[C007] Invalid actor type '{value}'. Expected one of: {expected}")]
    InvalidActorType { value: String, expected: String },

    /// C008: IO error with file path context
    #[error("[C008] IO error at {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// C009: Identifier rejected by validation
    #[error("[C009] Invalid {kind} '{value}': {reason}")]
    InvalidId {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}
