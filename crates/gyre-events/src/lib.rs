//! Prioritized event dispatcher for the Gyre runtime.
//!
//! The [`Dispatcher`] pairs a single unbounded FIFO queue with per-kind
//! prioritized subscriber chains. Publishing never blocks; delivery walks
//! each chain under [`Action`](gyre_core::Action)-driven flow control and
//! consumes the event's TTL budget one unit per handler invocation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod dispatcher;

pub use dispatcher::Dispatcher;
