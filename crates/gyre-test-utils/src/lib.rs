//! Test fixtures and helpers for Gyre development.
//!
//! Provides sample components and events, plus reusable processors for
//! pipeline and engine testing:
//!
//! - [`RecordingProcessor`]: appends its label to a shared trace.
//! - [`FailingProcessor`]: fails deterministically after N calls.
//! - [`DamageProcessor`]: the canonical health/damage tick behavior.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    Damage, DamageProcessor, FailingProcessor, Health, Position, RecordingProcessor, Tremor,
    Velocity,
};
