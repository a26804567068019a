//! The per-frame process a runner drives.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::messaging::FrameElement;
use crate::result::InsightsResult;

/// Callback a target uses to hand a produced result to its runner
pub type ResultCallback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, InsightsResult<()>> + Send + Sync>;

/// Something that runs in every frame and produces results of type `T`.
///
/// A target knows nothing about frames. The runner starts and stops it,
/// collects whatever it reports through the result callback, and calls
/// [`transform_child_result_for_parent`](Self::transform_child_result_for_parent)
/// once per frame boundary a result crosses on its way to the top window.
#[async_trait]
pub trait FrameTarget<T>: Send + Sync {
    /// Namespaces this target's commands
    fn command_suffix(&self) -> &str;

    /// Begin work in the current frame
    async fn start(&self) -> InsightsResult<()>;

    /// End work in the current frame
    async fn stop(&self) -> InsightsResult<()>;

    /// Rewrite a child frame's result so it makes sense in this frame
    fn transform_child_result_for_parent(&self, result: T, source_frame: &FrameElement) -> T;

    /// Install the callback results are reported through
    fn set_result_callback(&self, callback: ResultCallback<T>);
}
