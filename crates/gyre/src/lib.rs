//! Gyre: an in-process runtime for data-oriented simulations.
//!
//! Entities carry plain data records ("components"), processors run every
//! tick to transform them, and a prioritized event bus lets processors
//! communicate without direct references to each other. This facade crate
//! re-exports the public API from all Gyre sub-crates; for most users,
//! adding `gyre` as a single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use gyre::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Fuel(u32);
//! impl Component for Fuel {}
//!
//! /// Burns one unit of fuel per tick and retires empty tanks.
//! struct BurnProcessor;
//! impl Processor for BurnProcessor {
//!     fn process(&mut self, registry: &mut Registry) -> Result<(), ProcessError> {
//!         for entity in registry.entities_with::<(Fuel,)>() {
//!             let empty = match registry.component_of_mut::<Fuel>(entity) {
//!                 Some(fuel) => {
//!                     fuel.0 = fuel.0.saturating_sub(1);
//!                     fuel.0 == 0
//!                 }
//!                 None => false,
//!             };
//!             if empty {
//!                 registry.delete_entity(entity);
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! let tank = engine.with_registry(|registry| {
//!     registry.add_processor(Box::new(BurnProcessor)).unwrap();
//!     registry.create_entity(components![Fuel(2)])
//! });
//!
//! engine.update().unwrap(); // fuel 2 -> 1
//! engine.update().unwrap(); // fuel 1 -> 0, marked for deletion
//! engine.update().unwrap(); // deletion flushed
//! assert!(!engine.with_registry(|registry| registry.entity_exists(tank)));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `gyre-core` | IDs, component/event contracts, actions, errors |
//! | [`ecs`] | `gyre-ecs` | Registry, processors, scheduling, queries |
//! | [`events`] | `gyre-events` | The event dispatcher |
//! | [`engine`] | `gyre-engine` | Engine composition and loop configuration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`gyre-core`).
///
/// Contains [`types::Entity`], the [`types::Component`] and
/// [`types::Event`] contracts, [`types::Action`], [`types::Subscriber`],
/// and the error enums.
pub use gyre_core as types;

/// Registry, processors, and queries (`gyre-ecs`).
///
/// The [`ecs::Registry`] owns entity/component state and runs the
/// per-tick processor pipeline; [`ecs::Processor`] is the main extension
/// point for simulation logic.
pub use gyre_ecs as ecs;

/// The prioritized event dispatcher (`gyre-events`).
pub use gyre_events as events;

/// Engine composition and cooperative loops (`gyre-engine`).
///
/// [`engine::Engine`] for the two free-running loops or caller-driven
/// stepping.
pub use gyre_engine as engine;

// The bundle macro is exported at the root of gyre-core; surface it here
// so `gyre::components![..]` works too.
pub use gyre_core::components;

/// Common imports for typical Gyre usage.
///
/// ```rust
/// use gyre::prelude::*;
/// ```
pub mod prelude {
    // Core types and contracts
    pub use gyre_core::{
        components, Action, Component, Entity, Event, EventKind, EventLineage, Subscriber,
        TickId, Ttl, DEFAULT_PRIORITY,
    };

    // Errors
    pub use gyre_core::{ProcessError, RegistryError, ScheduleError, StepError};

    // Registry and processors
    pub use gyre_ecs::{ComponentSet, Processor, Registry, Schedule, TickMetrics};

    // Dispatcher
    pub use gyre_events::Dispatcher;

    // Engine
    pub use gyre_engine::{Engine, EngineConfig};
}
