//! All-frame runner.
//!
//! Runs a [`FrameTarget`] in the current window and every descendant iframe,
//! relaying results back up to the top window. See [`AllFrameRunner`].

mod commands;
mod runner;
mod target;

pub use commands::RunnerCommands;
pub use runner::{AllFrameRunner, FrameRunner, TopWindowCallback};
pub use target::{FrameTarget, ResultCallback};
