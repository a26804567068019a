//! Runner configuration
//!
//! Configuration types for the all-frame runner and the library as a whole.
//! Everything here deserializes from YAML or JSON and rejects unknown fields.

use crate::result::{InsightsError, InsightsResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default namespace prefix for frame runner commands
pub const DEFAULT_COMMAND_PREFIX: &str = "insights";

/// Default time a child frame has to answer a liveness ping
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 500;

/// Configuration for an all-frame runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameRunnerConfig {
    /// Prefix placed before every derived command name
    pub command_prefix: String,
    /// Per-frame ping timeout in milliseconds
    pub ping_timeout_ms: u64,
}

impl Default for FrameRunnerConfig {
    fn default() -> Self {
        Self {
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
        }
    }
}

impl FrameRunnerConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the command prefix
    #[must_use]
    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    /// Set the ping timeout in milliseconds
    #[must_use]
    pub const fn with_ping_timeout_ms(mut self, ms: u64) -> Self {
        self.ping_timeout_ms = ms;
        self
    }

    /// Ping timeout as a duration
    #[must_use]
    pub const fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Check the configuration for values the runner cannot work with
    pub fn validate(&self) -> InsightsResult<()> {
        if self.command_prefix.is_empty() {
            return Err(InsightsError::invalid_config("command_prefix is empty"));
        }
        if self.ping_timeout_ms == 0 {
            return Err(InsightsError::invalid_config("ping_timeout_ms must be > 0"));
        }
        Ok(())
    }
}

/// Top-level library configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InsightsConfig {
    /// Frame runner settings
    pub frame_runner: FrameRunnerConfig,
}

impl InsightsConfig {
    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> InsightsResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.frame_runner.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> InsightsResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.frame_runner.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FrameRunnerConfig::default();
        assert_eq!(config.command_prefix, "insights");
        assert_eq!(config.ping_timeout(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = FrameRunnerConfig::new()
            .with_command_prefix("scanner")
            .with_ping_timeout_ms(50);
        assert_eq!(config.command_prefix, "scanner");
        assert_eq!(config.ping_timeout_ms, 50);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(FrameRunnerConfig::new()
            .with_command_prefix("")
            .validate()
            .is_err());
        assert!(FrameRunnerConfig::new()
            .with_ping_timeout_ms(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = InsightsConfig::from_yaml("frame_runner:\n  ping_timeout_ms: 250\n").unwrap();
        assert_eq!(config.frame_runner.ping_timeout_ms, 250);
        assert_eq!(config.frame_runner.command_prefix, "insights");
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let result = InsightsConfig::from_json(r#"{"frame_runner": {"retries": 3}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_yaml_validates() {
        assert!(InsightsConfig::from_yaml("frame_runner:\n  ping_timeout_ms: 0\n").is_err());
    }
}
