//! Integration tests for processor dependency scheduling.
//!
//! Covers constraint satisfaction across registration orders, cycle
//! rejection semantics, and the reentrancy rules for processor-set
//! changes made from inside a tick.

use std::sync::{Arc, Mutex};

use gyre_core::{ProcessError, ScheduleError};
use gyre_ecs::{Processor, Registry, Schedule};

type Trace = Arc<Mutex<Vec<&'static str>>>;

macro_rules! traced_processor {
    ($ty:ident, $label:literal $(, $schedule:expr)?) => {
        struct $ty {
            trace: Trace,
        }

        impl Processor for $ty {
            fn name(&self) -> &'static str {
                $label
            }

            $(
                fn schedule(&self) -> Schedule {
                    $schedule
                }
            )?

            fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> {
                self.trace.lock().unwrap().push($label);
                Ok(())
            }
        }
    };
}

traced_processor!(Input, "input");
traced_processor!(Physics, "physics", Schedule::new().after::<Input>());
traced_processor!(Render, "render", Schedule::new().after::<Physics>());
traced_processor!(PreInput, "pre-input", Schedule::new().before::<Input>());

struct LoopA;
impl Processor for LoopA {
    fn name(&self) -> &'static str {
        "loop-a"
    }
    fn schedule(&self) -> Schedule {
        Schedule::new().before::<LoopB>()
    }
    fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> {
        Ok(())
    }
}

struct LoopB;
impl Processor for LoopB {
    fn name(&self) -> &'static str {
        "loop-b"
    }
    fn schedule(&self) -> Schedule {
        Schedule::new().before::<LoopA>()
    }
    fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> {
        Ok(())
    }
}

fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn constraints_hold_for_every_registration_order() {
    // All six permutations of {input, physics, render} must run in the
    // one order the constraints allow.
    let builders: [fn(Trace) -> Box<dyn Processor>; 3] = [
        |t| Box::new(Input { trace: t }),
        |t| Box::new(Physics { trace: t }),
        |t| Box::new(Render { trace: t }),
    ];
    let permutations = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for permutation in permutations {
        let mut registry = Registry::new();
        let observed = trace();
        for i in permutation {
            registry.add_processor(builders[i](observed.clone())).unwrap();
        }
        registry.update().unwrap();
        assert_eq!(
            observed.lock().unwrap().as_slice(),
            &["input", "physics", "render"],
            "registration order {permutation:?} violated constraints"
        );
    }
}

#[test]
fn before_constraint_pushes_ahead_of_later_registrations() {
    let mut registry = Registry::new();
    let observed = trace();
    registry
        .add_processor(Box::new(Input {
            trace: observed.clone(),
        }))
        .unwrap();
    registry
        .add_processor(Box::new(PreInput {
            trace: observed.clone(),
        }))
        .unwrap();

    registry.update().unwrap();
    assert_eq!(
        observed.lock().unwrap().as_slice(),
        &["pre-input", "input"]
    );
}

#[test]
fn cycle_is_rejected_and_prior_order_survives() {
    let mut registry = Registry::new();
    registry.add_processor(Box::new(LoopA)).unwrap();

    let err = registry.add_processor(Box::new(LoopB)).unwrap_err();
    let ScheduleError::Cycle { names } = err;
    assert!(names.contains(&"loop-a".to_string()));
    assert!(names.contains(&"loop-b".to_string()));

    // The registry is exactly as before the failed call.
    assert_eq!(registry.processor_count(), 1);
    assert!(registry.processor::<LoopA>().is_some());
    assert!(registry.processor::<LoopB>().is_none());
    registry.update().unwrap();
}

#[test]
fn cycle_on_empty_registry_leaves_no_processors() {
    let mut registry = Registry::new();
    registry.add_processor(Box::new(LoopB)).unwrap();
    assert!(registry.add_processor(Box::new(LoopA)).is_err());
    assert_eq!(registry.processor_count(), 1);
}

#[test]
fn processors_added_mid_tick_join_next_tick() {
    struct Spawner {
        trace: Trace,
        spawned: bool,
    }
    impl Processor for Spawner {
        fn name(&self) -> &'static str {
            "spawner"
        }
        fn process(&mut self, registry: &mut Registry) -> Result<(), ProcessError> {
            self.trace.lock().unwrap().push("spawner");
            if !self.spawned {
                self.spawned = true;
                registry
                    .add_processor(Box::new(Input {
                        trace: self.trace.clone(),
                    }))
                    .map_err(|err| ProcessError::Failed {
                        reason: err.to_string(),
                    })?;
            }
            Ok(())
        }
    }

    let mut registry = Registry::new();
    let observed = trace();
    registry
        .add_processor(Box::new(Spawner {
            trace: observed.clone(),
            spawned: false,
        }))
        .unwrap();

    registry.update().unwrap();
    // The freshly added processor must not run in the tick that added it.
    assert_eq!(observed.lock().unwrap().as_slice(), &["spawner"]);

    registry.update().unwrap();
    assert_eq!(
        observed.lock().unwrap().as_slice(),
        &["spawner", "spawner", "input"]
    );
}
