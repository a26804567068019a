//! Insights core: cross-frame result aggregation and step-driven workflows
//!
//! Two engines sit underneath an accessibility scanner that runs inside web
//! pages:
//!
//! - [`AllFrameRunner`] runs a [`FrameTarget`] in a window and every iframe
//!   below it, fans start and stop commands out through the frames that
//!   answer a ping, and relays results back up to the top window, rewriting
//!   them once per frame boundary.
//! - [`StateMachine`] drives a workflow as one current step out of a fixed
//!   table, with per-step action handlers and entry effects. The Android
//!   device setup in [`android_setup`] is built on it.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ top window                                                     │
//! │  TabStopsRequirementResultProcessor ──► AllFrameRunner         │
//! │                                          │  ▲                  │
//! │                       start/stop/ping    │  │ resultFromChild  │
//! │                                          ▼  │                  │
//! │   ┌──────────────────────────┐   ┌──────────────────────────┐  │
//! │   │ iframe: AllFrameRunner   │   │ iframe: AllFrameRunner   │  │
//! │   │   └─ FrameTarget         │   │   └─ nested iframes ...  │  │
//! │   └──────────────────────────┘   └──────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Windows talk through the [`FrameMessenger`] and [`FrameHost`] traits;
//! [`SimulatedBrowser`] implements both in memory.

#![warn(missing_docs)]
#![cfg_attr(test, allow(missing_docs))]

/// Android device setup workflow
pub mod android_setup;
mod config;
/// All-frame runner
pub mod frame_runner;
/// Cross-window messaging
pub mod messaging;
mod result;
/// Feature flags and user configuration
pub mod settings;
/// Step-based state machine
pub mod state_machine;
mod store;
/// Tab-stop requirement results
pub mod tab_stops;

pub use config::{FrameRunnerConfig, InsightsConfig, DEFAULT_COMMAND_PREFIX, DEFAULT_PING_TIMEOUT_MS};
pub use frame_runner::{AllFrameRunner, FrameRunner, FrameTarget, RunnerCommands};
pub use messaging::{FrameElement, FrameHost, FrameMessenger, SimulatedBrowser, WindowId};
pub use result::{InsightsError, InsightsResult};
pub use settings::{FeatureFlag, FeatureFlagStoreData, UserConfigurationStoreData};
pub use state_machine::{Action, Step, StateMachine, StepTransition};
pub use store::{ListenerId, StateStore};
