//! Gyre Quickstart: a complete, minimal simulation from scratch.
//!
//! Demonstrates:
//!   1. Defining components and a ticking processor
//!   2. Wiring processors into the registry with ordering constraints
//!   3. Publishing events from a processor and handling them
//!   4. Driving the engine caller-side with `update()`
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example quickstart

use gyre_core::{components, Action, Component, Event, ProcessError, Ttl};
use gyre_ecs::{Processor, Registry, Schedule};
use gyre_engine::Engine;

// ─── Components ─────────────────────────────────────────────────

#[derive(Debug)]
struct Position {
    x: f32,
}

impl Component for Position {}

#[derive(Debug)]
struct Velocity {
    dx: f32,
}

impl Component for Velocity {}

// ─── Events ─────────────────────────────────────────────────────

/// Published whenever an entity crosses the finish line.
struct FinishEvent {
    ttl: Ttl,
    x: f32,
}

impl Event for FinishEvent {
    fn ttl(&self) -> &Ttl {
        &self.ttl
    }
    fn ttl_mut(&mut self) -> &mut Ttl {
        &mut self.ttl
    }
}

// ─── Processors ─────────────────────────────────────────────────

/// Integrates velocity into position each tick.
struct MovementProcessor;

impl Processor for MovementProcessor {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn process(&mut self, registry: &mut Registry) -> Result<(), ProcessError> {
        for entity in registry.entities_with::<(Position, Velocity)>() {
            let dx = registry
                .component_of::<Velocity>(entity)
                .map_or(0.0, |v| v.dx);
            if let Some(position) = registry.component_of_mut::<Position>(entity) {
                position.x += dx;
            }
        }
        Ok(())
    }
}

/// Detects finishers after movement has integrated and retires them.
struct FinishLineProcessor {
    line: f32,
    dispatcher: std::sync::Arc<gyre_events::Dispatcher>,
}

impl Processor for FinishLineProcessor {
    fn name(&self) -> &'static str {
        "finish-line"
    }

    fn schedule(&self) -> Schedule {
        Schedule::new().after::<MovementProcessor>()
    }

    fn process(&mut self, registry: &mut Registry) -> Result<(), ProcessError> {
        for entity in registry.entities_with::<(Position,)>() {
            let Some(position) = registry.component_of::<Position>(entity) else {
                continue;
            };
            if position.x >= self.line {
                self.dispatcher.publish(FinishEvent {
                    ttl: Ttl::default(),
                    x: position.x,
                });
                registry.delete_entity(entity);
            }
        }
        Ok(())
    }
}

// ─── Main ───────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let mut engine = Engine::new();
    let dispatcher = engine.dispatcher().clone();

    dispatcher.on(0, |finish: &mut FinishEvent| {
        println!("finished at x = {:.1}", finish.x);
        Some(Action::stop())
    });

    engine.with_registry(|registry| {
        registry
            .add_processor(Box::new(MovementProcessor))
            .expect("movement schedules cleanly");
        registry
            .add_processor(Box::new(FinishLineProcessor {
                line: 10.0,
                dispatcher: dispatcher.clone(),
            }))
            .expect("finish-line schedules cleanly");

        registry.create_entity(components![Position { x: 0.0 }, Velocity { dx: 3.0 }]);
        registry.create_entity(components![Position { x: 0.0 }, Velocity { dx: 1.0 }]);
    });

    // Caller-driven stepping: deterministic, no background threads.
    for _ in 0..12 {
        let metrics = engine.update().expect("tick");
        println!(
            "tick {} ({} entities alive)",
            metrics.tick,
            engine.with_registry(|registry| registry.entity_count())
        );
    }
}
