//! Entity/component registry and processor scheduler for the Gyre runtime.
//!
//! The [`Registry`] owns entities and their component records and runs the
//! per-tick processor pipeline. [`Processor`]s declare before/after
//! ordering constraints through a [`Schedule`]; the registry keeps the
//! pipeline topologically sorted and rejects cycles at registration time.
//!
//! The registry is a plain [`Send`] value with `&mut self` mutation, like
//! a synchronous simulation world: callers that want a free-running tick
//! loop wrap it in a mutex and drive it from the engine crate.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod metrics;
pub mod processor;
pub mod query;
pub mod registry;
mod scheduler;

pub use metrics::TickMetrics;
pub use processor::{Processor, Schedule};
pub use query::{ComponentSet, TypeKeySet};
pub use registry::Registry;
