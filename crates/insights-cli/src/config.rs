//! Output settings shared by every command

use serde::{Deserialize, Serialize};

/// How much the CLI prints, on stdout and in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verbosity {
    /// Results only; errors in logs
    Quiet,
    /// Headers and summaries; warnings in logs
    #[default]
    Normal,
    /// Frame traffic and step effects from the insights crates
    Verbose,
    /// Everything, dependencies included
    Debug,
}

impl Verbosity {
    /// Level for `--quiet` and the number of `--verbose` flags; quiet wins
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Debug,
        }
    }

    /// Whether summaries and headers are suppressed
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// `tracing` filter used when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "insights_core=debug,insights_cli=debug",
            Self::Debug => "debug",
        }
    }
}

/// When to color terminal output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorChoice {
    /// Always
    Always,
    /// Only when stdout is a terminal
    #[default]
    Auto,
    /// Never
    Never,
}

impl ColorChoice {
    /// Resolve `Auto` against stdout
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// Output settings resolved from the global flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Normal verbosity, automatic color
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}
