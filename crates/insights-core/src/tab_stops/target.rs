//! Per-frame target that hands tab-stop results to the runner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::result::AutomatedTabStopRequirementResult;
use crate::frame_runner::{FrameTarget, ResultCallback};
use crate::messaging::FrameElement;
use crate::result::InsightsResult;

type Results = Vec<AutomatedTabStopRequirementResult>;

/// [`FrameTarget`] for tab-stop requirement results.
///
/// The in-frame evaluator calls [`report`](Self::report) with what it found;
/// results are only passed on between `start` and `stop`.
#[derive(Default)]
pub struct TabStopsRequirementTarget {
    active: AtomicBool,
    callback: Mutex<Option<ResultCallback<Results>>>,
}

impl TabStopsRequirementTarget {
    /// Command suffix shared by every tab-stop runner
    pub const COMMAND_SUFFIX: &'static str = "tabStopsRequirement";

    /// An inactive target with no result callback
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the target is started in this frame
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Hand `results` to the runner.
    ///
    /// Returns `Ok(false)` when nothing was sent: the target is stopped,
    /// no runner is attached, or `results` is empty.
    pub async fn report(&self, results: Results) -> InsightsResult<bool> {
        if !self.is_active() || results.is_empty() {
            return Ok(false);
        }
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(callback) = callback else {
            debug!(count = results.len(), "tab stop results reported before a runner attached");
            return Ok(false);
        };
        callback(results).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for TabStopsRequirementTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabStopsRequirementTarget")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FrameTarget<Results> for TabStopsRequirementTarget {
    fn command_suffix(&self) -> &str {
        Self::COMMAND_SUFFIX
    }

    async fn start(&self) -> InsightsResult<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> InsightsResult<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn transform_child_result_for_parent(&self, mut results: Results, source_frame: &FrameElement) -> Results {
        for result in &mut results {
            result.selector.insert(0, source_frame.selector.clone());
        }
        results
    }

    fn set_result_callback(&self, callback: ResultCallback<Results>) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }
}
