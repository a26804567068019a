//! Step-based state machine.
//!
//! A machine has one current step out of a fixed table. Steps handle the
//! actions they care about and may run an entry effect; both can move the
//! machine through a [`StepTransition`]. Tables are usually built from step
//! config functions through [`compose_steps_factory`].

mod factory;
mod machine;
mod step;
mod transition;

pub use factory::{compose_steps_factory, create_state_machine_steps, StepConfig, StepConfigs};
pub use machine::{StateMachine, StateMachineBuilder, StepsFactory, TransitionCallback};
pub use step::{Action, ActionHandler, EnterHandler, Step, StepFuture, StepId, StepTable};
pub use transition::{EnterTask, StepTransition, TransitionOutcome};
