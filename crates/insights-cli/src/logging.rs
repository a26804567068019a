//! Log output for the CLI.

use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the verbosity flags. Logs go to stderr so command
/// output on stdout stays machine readable.
pub fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(config.color.should_color())
        .with_writer(std::io::stderr)
        .try_init();
}
