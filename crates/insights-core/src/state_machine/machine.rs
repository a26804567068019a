//! The machine itself and its builder.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tracing::{debug, info};

use super::step::{Action, Step, StepFuture, StepId, StepTable};
use super::transition::{
    log_entry_outcome, EnterTask, StepTransition, TransitionOutcome, Transitioner,
};
use crate::result::{InsightsError, InsightsResult};

/// Builds a step table once the machine's transition handle exists
pub type StepsFactory<S, A> = Box<dyn FnOnce(StepTransition<S>) -> Option<StepTable<S, A>>>;

/// Observes every step change
pub type TransitionCallback<S> = Box<dyn Fn(S) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts spawned entry effects so owners can wait for quiescence
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }

    async fn wait(&self) {
        loop {
            let mut notified = std::pin::pin!(self.idle.notified());
            notified.as_mut().enable();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Transitions requested while another one is being entered
struct TransitionQueue<S> {
    busy: bool,
    pending: VecDeque<S>,
}

struct MachineCore<S: StepId, A: Action> {
    current: Mutex<Option<S>>,
    steps: OnceLock<StepTable<S, A>>,
    on_transition: TransitionCallback<S>,
    observer: watch::Sender<Option<S>>,
    in_flight: Arc<InFlight>,
    queue: Mutex<TransitionQueue<S>>,
    deferred: Mutex<Vec<EnterTask>>,
}

impl<S: StepId, A: Action> MachineCore<S, A> {
    fn step(&self, id: S) -> Option<&Step<A>> {
        self.steps
            .get()
            .and_then(|steps| steps.get(&id))
            .and_then(Option::as_ref)
    }

    /// Make `next` current, fire its entry effect, then tell the owner
    fn enter(&self, next: S, step: &Step<A>) -> Option<EnterTask> {
        *lock(&self.current) = Some(next);
        info!(step = ?next, "entered step");
        let on_enter = step.enter().map(|future| self.run_on_enter(next, future));
        (self.on_transition)(next);
        self.observer.send_replace(Some(next));
        on_enter
    }

    fn run_on_enter(&self, step: S, mut future: StepFuture) -> EnterTask {
        let label = format!("{step:?}");
        if let Some(outcome) = future.as_mut().now_or_never() {
            log_entry_outcome(&label, outcome);
            return EnterTask::finished();
        }
        match Handle::try_current() {
            Ok(handle) => {
                let guard = self.in_flight.begin();
                EnterTask::spawned(handle.spawn(async move {
                    log_entry_outcome(&label, future.await);
                    drop(guard);
                }))
            }
            Err(_) => {
                debug!(step = %label, "no tokio runtime, entry effect deferred");
                EnterTask::deferred(label, future)
            }
        }
    }
}

impl<S: StepId, A: Action> Transitioner<S> for MachineCore<S, A> {
    fn transition(&self, next: S) -> TransitionOutcome {
        let Some(step) = self.step(next) else {
            debug!(step = ?next, "transition to unimplemented step ignored");
            return TransitionOutcome::Ignored;
        };
        {
            let mut queue = lock(&self.queue);
            if queue.busy {
                debug!(step = ?next, "transition queued behind the one in progress");
                queue.pending.push_back(next);
                return TransitionOutcome::Queued;
            }
            queue.busy = true;
        }

        let on_enter = self.enter(next, step);
        loop {
            let queued = {
                let mut queue = lock(&self.queue);
                let Some(queued) = queue.pending.pop_front() else {
                    queue.busy = false;
                    break;
                };
                queued
            };
            let entered = self.step(queued).and_then(|step| self.enter(queued, step));
            if let Some(task) = entered.filter(EnterTask::is_deferred) {
                lock(&self.deferred).push(task);
            }
        }
        TransitionOutcome::Entered { on_enter }
    }
}

/// A finite state machine with exactly one current step.
///
/// Actions go to whichever step is current when they arrive; a step that has
/// no handler for an action ignores it. Steps move the machine through the
/// [`StepTransition`] handed to the steps factory.
///
/// Entering a step updates the current step, polls its entry effect once and
/// then calls the transition callback. A transition requested while another
/// is being entered, for example from inside an entry effect or the
/// callback, is queued and entered right after, so the callback sees steps
/// in the order they became current. Effects that suspend continue as
/// detached tokio tasks; [`wait_for_idle`](Self::wait_for_idle) waits for
/// all of them.
pub struct StateMachine<S: StepId, A: Action> {
    core: Arc<MachineCore<S, A>>,
    initial_entry: Mutex<Option<EnterTask>>,
}

impl<S: StepId, A: Action> fmt::Debug for StateMachine<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current_step", &self.current_step())
            .field("steps", &self.core.steps.get().map_or(0, |steps| steps.len()))
            .finish_non_exhaustive()
    }
}

impl<S: StepId, A: Action> StateMachine<S, A> {
    /// Build a machine and enter `first_step`
    pub fn new<F, C>(steps_factory: F, on_transition: C, first_step: S) -> InsightsResult<Self>
    where
        F: FnOnce(StepTransition<S>) -> Option<StepTable<S, A>> + 'static,
        C: Fn(S) + Send + Sync + 'static,
    {
        StateMachineBuilder::new()
            .steps_factory(steps_factory)
            .on_transition(on_transition)
            .first_step(first_step)
            .build()
    }

    /// Start building a machine
    #[must_use]
    pub fn builder() -> StateMachineBuilder<S, A> {
        StateMachineBuilder::new()
    }

    /// The current step; `None` if the first step was not implemented
    #[must_use]
    pub fn current_step(&self) -> Option<S> {
        *lock(&self.core.current)
    }

    /// Hand `action` to the current step.
    ///
    /// Returns whether a handler ran. An action the current step does not
    /// handle is ignored.
    pub fn invoke_action(&self, action: A) -> bool {
        let Some(current) = self.current_step() else {
            debug!(action = ?action.kind(), "no current step, action ignored");
            return false;
        };
        let kind = action.kind();
        let step = self
            .core
            .steps
            .get()
            .and_then(|steps| steps.get(&current))
            .and_then(Option::as_ref);
        match step {
            Some(step) if step.handles(kind) => {
                debug!(step = ?current, action = ?kind, "dispatching action");
                step.dispatch(action)
            }
            _ => {
                debug!(step = ?current, action = ?kind, "action not handled by current step");
                false
            }
        }
    }

    /// Watch the current step
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<S>> {
        self.core.observer.subscribe()
    }

    /// The first step's entry effect, available once
    pub fn take_initial_entry(&self) -> Option<EnterTask> {
        lock(&self.initial_entry).take()
    }

    /// Suspended entry effects of queued transitions made outside a tokio
    /// runtime; each runs when its task is settled
    pub fn take_deferred_entries(&self) -> Vec<EnterTask> {
        std::mem::take(&mut *lock(&self.core.deferred))
    }

    /// Wait until no spawned entry effect is running
    pub async fn wait_for_idle(&self) {
        self.core.in_flight.wait().await;
    }
}

/// Validating builder for [`StateMachine`]
pub struct StateMachineBuilder<S: StepId, A: Action> {
    steps_factory: Option<StepsFactory<S, A>>,
    on_transition: Option<TransitionCallback<S>>,
    first_step: Option<S>,
}

impl<S: StepId, A: Action> fmt::Debug for StateMachineBuilder<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachineBuilder")
            .field("steps_factory", &self.steps_factory.is_some())
            .field("on_transition", &self.on_transition.is_some())
            .field("first_step", &self.first_step)
            .finish()
    }
}

impl<S: StepId, A: Action> Default for StateMachineBuilder<S, A> {
    fn default() -> Self {
        Self {
            steps_factory: None,
            on_transition: None,
            first_step: None,
        }
    }
}

impl<S: StepId, A: Action> StateMachineBuilder<S, A> {
    /// Empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the steps factory
    #[must_use]
    pub fn steps_factory<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(StepTransition<S>) -> Option<StepTable<S, A>> + 'static,
    {
        self.steps_factory = Some(Box::new(factory));
        self
    }

    /// Set the step change callback
    #[must_use]
    pub fn on_transition<C>(mut self, callback: C) -> Self
    where
        C: Fn(S) + Send + Sync + 'static,
    {
        self.on_transition = Some(Box::new(callback));
        self
    }

    /// Set the first step
    #[must_use]
    pub const fn first_step(mut self, step: S) -> Self {
        self.first_step = Some(step);
        self
    }

    /// Validate, build the step table and enter the first step.
    ///
    /// Fails if the factory, the callback or the first step is missing, or
    /// if the factory returns no table or an empty one.
    pub fn build(self) -> InsightsResult<StateMachine<S, A>> {
        let steps_factory = self
            .steps_factory
            .ok_or(InsightsError::MissingStepsFactory)?;
        let on_transition = self
            .on_transition
            .ok_or(InsightsError::MissingTransitionCallback)?;
        let first_step = self.first_step.ok_or(InsightsError::MissingFirstStep)?;

        let (observer, _) = watch::channel(None);
        let core = Arc::new(MachineCore {
            current: Mutex::new(None),
            steps: OnceLock::new(),
            on_transition,
            observer,
            in_flight: Arc::default(),
            queue: Mutex::new(TransitionQueue {
                busy: false,
                pending: VecDeque::new(),
            }),
            deferred: Mutex::new(Vec::new()),
        });

        let weak = Arc::downgrade(&core);
        let weak: Weak<dyn Transitioner<S>> = weak;
        let steps = steps_factory(StepTransition::for_machine(weak))
            .filter(|steps| !steps.is_empty())
            .ok_or(InsightsError::InvalidStepTable)?;
        core.steps
            .set(steps)
            .map_err(|_| InsightsError::InvalidStepTable)?;

        let initial_entry = core.transition(first_step).into_enter_task();
        Ok(StateMachine {
            core,
            initial_entry: Mutex::new(initial_entry),
        })
    }
}
