//! Output formatting

use console::{style, Term};
use serde::Serialize;

use crate::commands::OutputFormatArg;
use crate::config::CliConfig;
use crate::error::CliResult;

/// Writes command output to stdout, styled when colors are enabled
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Selected output format
    pub format: OutputFormatArg,
}

impl Reporter {
    /// Create a reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool, format: OutputFormatArg) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
            format,
        }
    }

    /// Create a reporter from CLI configuration
    #[must_use]
    pub fn from_config(config: &CliConfig, format: OutputFormatArg) -> Self {
        Self::new(
            config.color.should_color(),
            config.verbosity.is_quiet(),
            format,
        )
    }

    /// Whether JSON output was requested
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format == OutputFormatArg::Json
    }

    /// Print `value` as pretty JSON. Printed even in quiet mode.
    pub fn json<T: Serialize>(&self, value: &T) -> CliResult<()> {
        let rendered = serde_json::to_string_pretty(value)?;
        self.term.write_line(&rendered)?;
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an indented list entry
    pub fn item(&self, message: &str) {
        if self.quiet {
            return;
        }

        let bullet = if self.use_color {
            style("•").dim().to_string()
        } else {
            "-".to_string()
        };

        let _ = self.term.write_line(&format!("  {bullet} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line(&styled);
    }
}
