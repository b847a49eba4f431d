//! Reusable component, event, and processor fixtures.

use std::sync::{Arc, Mutex};

use gyre_core::{Component, Event, ProcessError, Ttl};
use gyre_ecs::{Processor, Registry};

// ── Components ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    pub value: i32,
}

impl Health {
    pub fn new(value: i32) -> Self {
        Self { value }
    }
}

impl Component for Health {}

#[derive(Debug, Clone, PartialEq)]
pub struct Damage {
    pub amount: i32,
    pub ticks: u32,
}

impl Damage {
    pub fn new(amount: i32, ticks: u32) -> Self {
        Self { amount, ticks }
    }
}

impl Component for Damage {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

impl Component for Velocity {}

// ── Events ─────────────────────────────────────────────────────────

/// A sample event with an integer payload.
pub struct Tremor {
    pub ttl: Ttl,
    pub magnitude: i32,
}

impl Tremor {
    pub fn new(magnitude: i32) -> Self {
        Self {
            ttl: Ttl::default(),
            magnitude,
        }
    }
}

impl Event for Tremor {
    fn ttl(&self) -> &Ttl {
        &self.ttl
    }
    fn ttl_mut(&mut self) -> &mut Ttl {
        &mut self.ttl
    }
}

// ── Processors ─────────────────────────────────────────────────────

/// Appends its label to a shared trace every tick.
///
/// Useful for asserting run order and that a loop is making progress.
pub struct RecordingProcessor {
    pub label: &'static str,
    pub trace: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingProcessor {
    pub fn new(label: &'static str, trace: Arc<Mutex<Vec<&'static str>>>) -> Self {
        Self { label, trace }
    }
}

impl Processor for RecordingProcessor {
    fn name(&self) -> &'static str {
        self.label
    }

    fn process(&mut self, _registry: &mut Registry) -> Result<(), ProcessError> {
        self.trace.lock().unwrap().push(self.label);
        Ok(())
    }
}

/// Succeeds `fail_after` times, then fails every call.
pub struct FailingProcessor {
    pub fail_after: usize,
    calls: usize,
}

impl FailingProcessor {
    pub fn new(fail_after: usize) -> Self {
        Self {
            fail_after,
            calls: 0,
        }
    }
}

impl Processor for FailingProcessor {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn process(&mut self, _registry: &mut Registry) -> Result<(), ProcessError> {
        self.calls += 1;
        if self.calls > self.fail_after {
            return Err(ProcessError::Failed {
                reason: format!("deterministic failure on call {}", self.calls),
            });
        }
        Ok(())
    }
}

/// Applies [`Damage`] to [`Health`] each tick and removes the damage
/// component once its tick budget is spent.
pub struct DamageProcessor;

impl Processor for DamageProcessor {
    fn name(&self) -> &'static str {
        "damage"
    }

    fn process(&mut self, registry: &mut Registry) -> Result<(), ProcessError> {
        for entity in registry.entities_with::<(Health, Damage)>() {
            let Some(damage) = registry.component_of::<Damage>(entity) else {
                continue;
            };
            let amount = damage.amount;

            if let Some(health) = registry.component_of_mut::<Health>(entity) {
                health.value -= amount;
            }

            let spent = match registry.component_of_mut::<Damage>(entity) {
                Some(damage) => {
                    damage.ticks = damage.ticks.saturating_sub(1);
                    damage.ticks == 0
                }
                None => false,
            };
            if spent {
                registry.remove_component::<Damage>(entity)?;
            }
        }
        Ok(())
    }
}
