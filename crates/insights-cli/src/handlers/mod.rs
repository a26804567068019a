//! Command handlers

pub mod config;
pub mod frames;
pub mod setup;

use crate::error::{CliError, CliResult};

/// Runtime the async library calls are driven on
pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::run(format!("Failed to create runtime: {e}")))
}
