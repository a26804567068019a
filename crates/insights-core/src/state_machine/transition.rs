//! The handle steps use to move the machine, and what a move produces.

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tracing::warn;

use super::step::{StepFuture, StepId};
use crate::result::InsightsResult;

pub(crate) trait Transitioner<S>: Send + Sync {
    fn transition(&self, next: S) -> TransitionOutcome;
}

pub(crate) fn log_entry_outcome(step: &str, outcome: InsightsResult<()>) {
    if let Err(err) = outcome {
        warn!(step, error = %err, "step entry effect failed");
    }
}

enum EnterTaskInner {
    Finished,
    Spawned(JoinHandle<()>),
    Deferred { step: String, future: StepFuture },
}

/// The entry effect of a step that was just entered.
///
/// The effect is polled once before the machine reports the new step, so
/// anything it does before its first suspension has already happened. If it
/// suspended, inside a tokio runtime the rest runs as its own task and
/// dropping this handle does not cancel it; outside a runtime the rest is
/// held here and only runs when [`settled`](Self::settled) is awaited.
pub struct EnterTask {
    inner: EnterTaskInner,
}

impl fmt::Debug for EnterTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            EnterTaskInner::Finished => f.debug_struct("EnterTask").field("finished", &true).finish(),
            EnterTaskInner::Spawned(handle) => f
                .debug_struct("EnterTask")
                .field("finished", &handle.is_finished())
                .finish(),
            EnterTaskInner::Deferred { step, .. } => f
                .debug_struct("EnterTask")
                .field("deferred", step)
                .finish(),
        }
    }
}

impl EnterTask {
    pub(crate) const fn finished() -> Self {
        Self {
            inner: EnterTaskInner::Finished,
        }
    }

    pub(crate) const fn spawned(handle: JoinHandle<()>) -> Self {
        Self {
            inner: EnterTaskInner::Spawned(handle),
        }
    }

    pub(crate) const fn deferred(step: String, future: StepFuture) -> Self {
        Self {
            inner: EnterTaskInner::Deferred { step, future },
        }
    }

    /// Whether the effect waits for [`settled`](Self::settled) to run
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self.inner, EnterTaskInner::Deferred { .. })
    }

    /// Whether the effect completed without suspending
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.inner, EnterTaskInner::Finished)
    }

    /// Wait for the entry effect to finish. Failures are logged, not returned.
    pub async fn settled(self) {
        match self.inner {
            EnterTaskInner::Finished => {}
            EnterTaskInner::Spawned(handle) => {
                if let Err(err) = handle.await {
                    warn!(error = %err, "step entry task did not complete");
                }
            }
            EnterTaskInner::Deferred { step, future } => {
                log_entry_outcome(&step, future.await);
            }
        }
    }
}

/// Result of asking the machine to move to a step
#[derive(Debug)]
pub enum TransitionOutcome {
    /// The step is unknown or unimplemented; nothing changed
    Ignored,
    /// The step is now current
    Entered {
        /// The step's entry effect, if it has one
        on_enter: Option<EnterTask>,
    },
    /// Another transition is being entered; this one runs right after it
    Queued,
}

impl TransitionOutcome {
    /// Whether the transition happened
    #[must_use]
    pub const fn is_entered(&self) -> bool {
        matches!(self, Self::Entered { .. })
    }

    /// Whether the transition was queued behind one in progress
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }

    /// The entry effect, if the step was entered and has one
    #[must_use]
    pub fn into_enter_task(self) -> Option<EnterTask> {
        match self {
            Self::Entered { on_enter } => on_enter,
            Self::Ignored | Self::Queued => None,
        }
    }

    /// Wait for the entry effect, if any
    pub async fn settled(self) {
        if let Some(task) = self.into_enter_task() {
            task.settled().await;
        }
    }
}

enum Sink<S> {
    Machine(Weak<dyn Transitioner<S>>),
    Detached(Arc<dyn Fn(S) + Send + Sync>),
}

/// Lets steps move their machine to another step.
///
/// The steps factory receives one of these before the machine has finished
/// building; transitions requested before that point are ignored, as are
/// transitions after the machine is dropped.
pub struct StepTransition<S> {
    sink: Sink<S>,
}

impl<S> Clone for StepTransition<S> {
    fn clone(&self) -> Self {
        let sink = match &self.sink {
            Sink::Machine(machine) => Sink::Machine(Weak::clone(machine)),
            Sink::Detached(callback) => Sink::Detached(Arc::clone(callback)),
        };
        Self { sink }
    }
}

impl<S> fmt::Debug for StepTransition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.sink {
            Sink::Machine(_) => "machine",
            Sink::Detached(_) => "detached",
        };
        f.debug_struct("StepTransition").field("sink", &kind).finish()
    }
}

impl<S: StepId> StepTransition<S> {
    pub(crate) fn for_machine(machine: Weak<dyn Transitioner<S>>) -> Self {
        Self {
            sink: Sink::Machine(machine),
        }
    }

    /// A transition handle not attached to any machine.
    ///
    /// Every request is passed to `callback` and reported as entered with no
    /// entry effect. Useful for exercising step configs on their own.
    pub fn detached<F>(callback: F) -> Self
    where
        F: Fn(S) + Send + Sync + 'static,
    {
        Self {
            sink: Sink::Detached(Arc::new(callback)),
        }
    }

    /// Move to `next`
    pub fn to(&self, next: S) -> TransitionOutcome {
        match &self.sink {
            Sink::Machine(machine) => match machine.upgrade() {
                Some(machine) => machine.transition(next),
                None => TransitionOutcome::Ignored,
            },
            Sink::Detached(callback) => {
                callback(next);
                TransitionOutcome::Entered { on_enter: None }
            }
        }
    }
}
