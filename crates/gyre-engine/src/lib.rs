//! Engine composition for the Gyre runtime.
//!
//! An [`Engine`] owns exactly one registry and one dispatcher and runs
//! each on its own cooperative loop:
//!
//! ```text
//! User Thread(s)            Registry Thread           Dispatcher Thread
//!     |                          |                          |
//!     |--with_registry(f)------->| lock registry            |
//!     |   (between ticks)        | update(): flush dead,    |
//!     |                          |   run processors         |
//!     |                          | unlock, sleep(tick)      |
//!     |                          |                          |
//!     |--dispatcher().publish()------------------------->   |
//!     |   [unbounded FIFO]                  recv_timeout(poll)
//!     |                                     deliver one event
//!     |                                     (subscriber chains)
//! ```
//!
//! Alternatively, skip `start()` entirely and call
//! [`Engine::update()`](Engine::update) from your own loop for fully
//! deterministic single-threaded stepping.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
mod loops;

pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, EngineError};
