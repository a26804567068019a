//! Error types for the CLI

use std::path::PathBuf;

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Scenario file could not be used
    #[error("Invalid scenario {path}: {message}")]
    Scenario {
        /// Scenario file
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// Running a scenario failed
    #[error("Scenario run failed: {message}")]
    Run {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Insights library error
    #[error("Insights error: {0}")]
    Insights(#[from] insights_core::InsightsError),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a scenario error
    #[must_use]
    pub fn scenario(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Scenario {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a run error
    #[must_use]
    pub fn run(message: impl Into<String>) -> Self {
        Self::Run {
            message: message.into(),
        }
    }
}
