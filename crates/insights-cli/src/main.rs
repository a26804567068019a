//! Insights CLI: collect frame results and walk the device setup workflow
//!
//! ## Usage
//!
//! ```bash
//! insights frames page.yaml             # Collect tab-stop results
//! insights setup device.yaml -f json    # Walk the setup steps
//! insights config                       # Show the default configuration
//! ```

use std::process::ExitCode;

use clap::Parser;
use insights_cli::handlers::{config::execute_config, frames::execute_frames, setup::execute_setup};
use insights_cli::{init_tracing, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(&config);

    match &cli.command {
        Commands::Frames(args) => execute_frames(&config, args),
        Commands::Setup(args) => execute_setup(&config, args),
        Commands::Config(args) => execute_config(&config, args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
