//! Steps, actions and step tables.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;

use futures::future::{BoxFuture, FutureExt};

use crate::result::InsightsResult;

/// Identifies a step. Usually a fieldless enum.
pub trait StepId: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> StepId for T where T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// An action the machine can be asked to handle.
///
/// Actions are enums whose variants carry their own payloads; [`kind`](Self::kind)
/// returns the payload-free discriminant handlers are registered under.
pub trait Action: Send + 'static {
    /// Payload-free discriminant
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// The discriminant of this action
    fn kind(&self) -> Self::Kind;
}

/// Future produced by a step's entry side effect
pub type StepFuture = BoxFuture<'static, InsightsResult<()>>;

/// Handles one action kind within a step
pub type ActionHandler<A> = Box<dyn Fn(A) + Send + Sync>;

/// Runs when a step is entered
pub type EnterHandler = Box<dyn Fn() -> StepFuture + Send + Sync>;

/// Behaviour of one step: sparse action handlers plus an optional entry effect
pub struct Step<A: Action> {
    actions: HashMap<A::Kind, ActionHandler<A>>,
    on_enter: Option<EnterHandler>,
}

/// Every step of a machine. A `None` entry is a step that exists by name but
/// is not implemented; transitions into it are ignored.
pub type StepTable<S, A> = HashMap<S, Option<Step<A>>>;

impl<A: Action> Default for Step<A> {
    fn default() -> Self {
        Self {
            actions: HashMap::new(),
            on_enter: None,
        }
    }
}

impl<A: Action> fmt::Debug for Step<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("on_enter", &self.on_enter.is_some())
            .finish()
    }
}

impl<A: Action> Step<A> {
    /// A step with no actions and no entry effect
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle `kind` with `handler`
    #[must_use]
    pub fn on_action<F>(mut self, kind: A::Kind, handler: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        self.actions.insert(kind, Box::new(handler));
        self
    }

    /// Run `effect` every time the step is entered
    #[must_use]
    pub fn on_enter<F, Fut>(mut self, effect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = InsightsResult<()>> + Send + 'static,
    {
        self.on_enter = Some(Box::new(move || effect().boxed()));
        self
    }

    /// Whether this step handles `kind`
    #[must_use]
    pub fn handles(&self, kind: A::Kind) -> bool {
        self.actions.contains_key(&kind)
    }

    /// Whether this step has an entry effect
    #[must_use]
    pub const fn has_on_enter(&self) -> bool {
        self.on_enter.is_some()
    }

    /// Action kinds this step handles
    pub fn action_kinds(&self) -> impl Iterator<Item = A::Kind> + '_ {
        self.actions.keys().copied()
    }

    /// Hand `action` to its handler. Returns `false` if there is none.
    pub fn dispatch(&self, action: A) -> bool {
        match self.actions.get(&action.kind()) {
            Some(handler) => {
                handler(action);
                true
            }
            None => false,
        }
    }

    /// Start the entry effect, if any
    #[must_use]
    pub fn enter(&self) -> Option<StepFuture> {
        self.on_enter.as_ref().map(|effect| effect())
    }
}
