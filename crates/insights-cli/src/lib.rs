//! Insights CLI library
//!
//! Drives the insights core against simulated pages and scripted devices so
//! frame collection and the device setup workflow can be exercised from the
//! command line.
//!
//! ## Usage
//!
//! ```bash
//! insights frames scenarios/nested-frames.yaml
//! insights setup scenarios/android-happy-path.yaml --format json
//! insights config --file insights.yaml
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;
pub mod scenario;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, FramesArgs, OutputFormatArg, SetupArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_tracing;
pub use output::Reporter;
pub use scenario::{FrameScenario, FrameSpec, LoadedPage, ScenarioResult, SetupScenario};
