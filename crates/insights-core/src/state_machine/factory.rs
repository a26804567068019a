//! Building step tables from step config functions.

use std::collections::HashMap;

use super::step::{Action, Step, StepId, StepTable};
use super::transition::StepTransition;

/// Builds one step from the shared dependency bag
pub type StepConfig<D, A> = fn(&D) -> Step<A>;

/// Step configs keyed by step. A `None` entry is an unimplemented step.
pub type StepConfigs<S, D, A> = HashMap<S, Option<StepConfig<D, A>>>;

/// Apply every config to `deps`; `None` entries stay `None`
pub fn create_state_machine_steps<S, D, A>(deps: &D, configs: &StepConfigs<S, D, A>) -> StepTable<S, A>
where
    S: StepId,
    A: Action,
{
    configs
        .iter()
        .map(|(id, config)| (*id, config.map(|build| build(deps))))
        .collect()
}

/// Defer building the step table until the machine's transition handle exists.
///
/// `merge` combines the base dependencies with the transition handle into
/// the dependency bag every config receives. The returned closure is what
/// [`StateMachine::new`](super::StateMachine::new) expects as its factory.
pub fn compose_steps_factory<S, B, D, A, M>(
    base: B,
    configs: StepConfigs<S, D, A>,
    merge: M,
) -> impl FnOnce(StepTransition<S>) -> Option<StepTable<S, A>>
where
    S: StepId,
    A: Action,
    M: FnOnce(B, StepTransition<S>) -> D,
{
    move |transition| {
        let deps = merge(base, transition);
        Some(create_state_machine_steps(&deps, &configs))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state_machine::StateMachine;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Door {
        Closed,
        Open,
        Locked,
    }

    #[derive(Debug)]
    enum Push {
        Push,
    }

    impl Action for Push {
        type Kind = ();

        fn kind(&self) {}
    }

    #[derive(Clone)]
    struct Deps {
        log: Arc<Mutex<Vec<&'static str>>>,
        transition: StepTransition<Door>,
    }

    fn closed(deps: &Deps) -> Step<Push> {
        deps.log.lock().unwrap().push("built closed");
        let transition = deps.transition.clone();
        Step::new().on_action((), move |Push::Push| {
            transition.to(Door::Open);
        })
    }

    fn open(deps: &Deps) -> Step<Push> {
        deps.log.lock().unwrap().push("built open");
        let transition = deps.transition.clone();
        Step::new().on_action((), move |Push::Push| {
            transition.to(Door::Locked);
        })
    }

    fn configs() -> StepConfigs<Door, Deps, Push> {
        let mut configs: StepConfigs<Door, Deps, Push> = HashMap::new();
        configs.insert(Door::Closed, Some(closed));
        configs.insert(Door::Open, Some(open));
        configs.insert(Door::Locked, None);
        configs
    }

    #[test]
    fn test_null_configs_pass_through() {
        let deps = Deps {
            log: Arc::default(),
            transition: StepTransition::detached(|_| {}),
        };
        let steps = create_state_machine_steps(&deps, &configs());
        assert_eq!(steps.len(), 3);
        assert!(steps[&Door::Closed].is_some());
        assert!(steps[&Door::Open].is_some());
        assert!(steps[&Door::Locked].is_none());
    }

    #[test]
    fn test_each_config_called_once() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let deps = Deps {
            log: log.clone(),
            transition: StepTransition::detached(|_| {}),
        };
        create_state_machine_steps(&deps, &configs());
        let mut built = log.lock().unwrap().clone();
        built.sort_unstable();
        assert_eq!(built, vec!["built closed", "built open"]);
    }

    #[test]
    fn test_detached_transition_records_requests() {
        let requested = Arc::new(Mutex::new(Vec::new()));
        let sink = requested.clone();
        let deps = Deps {
            log: Arc::default(),
            transition: StepTransition::detached(move |door| sink.lock().unwrap().push(door)),
        };
        let steps = create_state_machine_steps(&deps, &configs());
        steps[&Door::Closed].as_ref().unwrap().dispatch(Push::Push);
        assert_eq!(requested.lock().unwrap().as_slice(), &[Door::Open]);
    }

    #[tokio::test]
    async fn test_composed_factory_wires_machine_transition() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let factory = compose_steps_factory(log, configs(), |log, transition| Deps { log, transition });
        let machine = StateMachine::new(factory, |_| {}, Door::Closed).unwrap();

        machine.invoke_action(Push::Push);
        assert_eq!(machine.current_step(), Some(Door::Open));
        machine.invoke_action(Push::Push);
        assert_eq!(machine.current_step(), Some(Door::Open));
    }
}
