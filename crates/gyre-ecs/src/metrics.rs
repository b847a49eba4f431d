//! Per-tick timing metrics for the registry.
//!
//! [`TickMetrics`] captures what one `update()` pass did and how long it
//! took, for telemetry and test assertions. Durations are in
//! microseconds.

use gyre_core::TickId;

/// Timing data collected during a single registry tick.
#[derive(Clone, Debug, Default)]
pub struct TickMetrics {
    /// The tick this data describes.
    pub tick: TickId,
    /// Wall-clock time for the entire tick, in microseconds.
    pub total_us: u64,
    /// Time spent flushing deferred entity deletions, in microseconds.
    pub flush_us: u64,
    /// Number of entities removed by the deletion flush.
    pub entities_flushed: usize,
    /// Per-processor execution times: `(name, microseconds)`, in run order.
    pub processor_us: Vec<(&'static str, u64)>,
}
