//! Result and error types for Insights.

use thiserror::Error;

/// Result type for Insights operations
pub type InsightsResult<T> = Result<T, InsightsError>;

/// Errors that can occur in Insights
#[derive(Debug, Error)]
pub enum InsightsError {
    /// State machine built without a steps factory
    #[error("State machine requires a steps factory")]
    MissingStepsFactory,

    /// State machine built without a step transition callback
    #[error("State machine requires a step transition callback")]
    MissingTransitionCallback,

    /// State machine built without a first step
    #[error("State machine requires a first step")]
    MissingFirstStep,

    /// Steps factory returned nothing usable
    #[error("Steps factory did not return a step table")]
    InvalidStepTable,

    /// A result arrived from a window that is not one of our frames
    #[error("unable to get frame element for the given window")]
    FrameNotFound,

    /// A relayed message carried no source window
    #[error("message from child frame has no source window")]
    MissingSourceWindow,

    /// The target window is not known to the transport
    #[error("target window unreachable: {window}")]
    WindowUnreachable {
        /// Window identifier
        window: String,
    },

    /// Target frame is sandboxed without `allow-scripts`
    #[error("Target frame has a sandbox attribute which disallows scripts")]
    SandboxDisallowsScripts,

    /// Target frame has no content window
    #[error("Target frame does not have a contentWindow")]
    MissingContentWindow,

    /// Child frames are not top windows and need a parent to report to
    #[error("Window {window} has no parent to relay results to")]
    MissingParentWindow {
        /// Window identifier
        window: String,
    },

    /// A message listener failed while handling a command
    #[error("Listener for {command} failed: {message}")]
    ListenerFailed {
        /// Command being handled
        command: String,
        /// Error message
        message: String,
    },

    /// A frame target failed to start or stop
    #[error("Frame target failed: {message}")]
    TargetFailed {
        /// Error message
        message: String,
    },

    /// The runner was dropped while one of its listeners was still registered
    #[error("Frame runner for {command} is no longer alive")]
    RunnerDropped {
        /// Command whose listener outlived the runner
        command: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Android setup dependency failure
    #[error("Device setup failed: {message}")]
    DeviceSetup {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl InsightsError {
    /// Create a listener failure
    #[must_use]
    pub fn listener_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ListenerFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a target failure
    #[must_use]
    pub fn target_failed(message: impl Into<String>) -> Self {
        Self::TargetFailed {
            message: message.into(),
        }
    }

    /// Create a device setup failure
    #[must_use]
    pub fn device_setup(message: impl Into<String>) -> Self {
        Self::DeviceSetup {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error marks a construction failure of a state machine
    #[must_use]
    pub const fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::MissingStepsFactory
                | Self::MissingTransitionCallback
                | Self::MissingFirstStep
                | Self::InvalidStepTable
        )
    }
}
