//! cv-migrate - Migration applier for Convoy
//!
//! Applies an ordered plan of SQL files (single files interleaved with
//! directory globs) to a [`cv_db::Database`], warning on missing files and
//! aborting on the first failing one.

pub mod error;
pub mod plan;
pub mod runner;

pub use error::{MigrateError, MigrateResult};
pub use plan::{resolve_plan, PlannedFile, ResolvedStep};
pub use runner::{ApplyReport, FileOutcome, FileStatus, MigrationRunner, StepEvent};
