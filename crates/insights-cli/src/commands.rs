//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Insights: run cross-frame collection and device setup scenarios
#[derive(Parser, Debug)]
#[command(name = "insights")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect tab-stop results across a simulated frame tree
    Frames(FramesArgs),

    /// Walk the Android setup workflow against a scripted device
    Setup(SetupArgs),

    /// Show the effective runner configuration
    Config(ConfigArgs),
}

/// Arguments for the frames command
#[derive(Parser, Debug)]
pub struct FramesArgs {
    /// Frame tree scenario (YAML)
    pub scenario: PathBuf,

    /// Runner configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormatArg,
}

/// Arguments for the setup command
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Device setup scenario (YAML)
    pub scenario: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormatArg,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration file to load (YAML or JSON); defaults are shown without one
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_frames() {
        let cli = Cli::parse_from(["insights", "-vv", "frames", "page.yaml", "--format", "json"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Frames(args) => {
                assert_eq!(args.scenario, PathBuf::from("page.yaml"));
                assert_eq!(args.format, OutputFormatArg::Json);
                assert!(args.config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_setup_with_global_flags_after() {
        let cli = Cli::parse_from(["insights", "setup", "device.yaml", "--quiet", "--color", "never"]);
        assert!(cli.quiet);
        assert!(matches!(cli.color, ColorArg::Never));
        assert!(matches!(cli.command, Commands::Setup(_)));
    }

    #[test]
    fn test_requires_subcommand() {
        assert!(Cli::try_parse_from(["insights"]).is_err());
    }
}
