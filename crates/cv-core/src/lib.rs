//! cv-core - Core library for Convoy
//!
//! This crate provides shared types used across all Convoy components:
//! configuration parsing, the migration step model, typed identifiers, and
//! the conversation state history record.

pub mod config;
pub mod error;
pub mod history;
pub mod ids;
mod string_id;
pub mod step;

pub use config::{Config, DatabaseConfig, DbType, TargetConfig};
pub use error::{CoreError, CoreResult};
pub use history::{ActorType, HistoryEntry, NewTransition};
pub use ids::{ConversationId, HistoryId};
pub use step::MigrationStep;
