//! CLI command implementations

pub(crate) mod common;
pub(crate) mod history;
pub(crate) mod init;
pub(crate) mod migrate;
pub(crate) mod plan;
