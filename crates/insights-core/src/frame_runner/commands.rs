//! Command names derived from a runner's suffix.

use std::fmt;

use crate::config::DEFAULT_COMMAND_PREFIX;

/// The four namespaced commands a runner listens for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommands {
    /// Starts the target in a frame and its descendants
    pub start: String,
    /// Stops the target in a frame and its descendants
    pub stop: String,
    /// Liveness check used during discovery
    pub ping: String,
    /// Carries a result from a child frame to its parent
    pub result_from_child: String,
}

impl RunnerCommands {
    /// Derive the command names for `suffix` under `prefix`
    #[must_use]
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self {
            start: format!("{prefix}.startFrameRunner-{suffix}"),
            stop: format!("{prefix}.stopFrameRunner-{suffix}"),
            ping: format!("{prefix}.pingFrame-{suffix}"),
            result_from_child: format!("{prefix}.resultFromChild-{suffix}"),
        }
    }

    /// Derive the command names for `suffix` under the default prefix
    #[must_use]
    pub fn for_suffix(suffix: &str) -> Self {
        Self::new(DEFAULT_COMMAND_PREFIX, suffix)
    }

    /// All four names
    #[must_use]
    pub fn all(&self) -> [&str; 4] {
        [
            &self.start,
            &self.stop,
            &self.ping,
            &self.result_from_child,
        ]
    }

    /// Whether `command` is one of this runner's commands
    #[must_use]
    pub fn contains(&self, command: &str) -> bool {
        self.all().contains(&command)
    }
}

impl fmt::Display for RunnerCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.all().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_prefix_names() {
        let commands = RunnerCommands::for_suffix("x");
        assert_eq!(
            commands.all(),
            [
                "insights.startFrameRunner-x",
                "insights.stopFrameRunner-x",
                "insights.pingFrame-x",
                "insights.resultFromChild-x",
            ]
        );
    }

    #[test]
    fn test_custom_prefix() {
        let commands = RunnerCommands::new("scanner", "tabStopsRequirement");
        assert_eq!(commands.ping, "scanner.pingFrame-tabStopsRequirement");
        assert!(commands.contains("scanner.stopFrameRunner-tabStopsRequirement"));
        assert!(!commands.contains("insights.stopFrameRunner-tabStopsRequirement"));
    }

    proptest! {
        #[test]
        fn prop_distinct_suffixes_never_collide(a in ".{0,16}", b in ".{0,16}") {
            prop_assume!(a != b);
            let first = RunnerCommands::for_suffix(&a);
            let second = RunnerCommands::for_suffix(&b);
            for name in first.all() {
                prop_assert!(!second.contains(name));
            }
        }

        #[test]
        fn prop_names_within_runner_are_distinct(suffix in ".{0,16}") {
            let commands = RunnerCommands::for_suffix(&suffix);
            let names = commands.all();
            for (i, a) in names.iter().enumerate() {
                for b in &names[i + 1..] {
                    prop_assert_ne!(a, b);
                }
            }
        }
    }
}
