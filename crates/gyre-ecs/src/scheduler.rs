//! Dependency sort for the processor pipeline.
//!
//! Builds a directed graph with one node per processor instance: for each
//! declared "after" type, edges run from every registered instance of
//! that type to the declaring processor; "before" constraints add the
//! mirrored edges. Kahn's algorithm produces the execution order; a
//! non-empty remainder means the constraints are cyclic.

use std::collections::VecDeque;

use gyre_core::ScheduleError;

use crate::processor::Processor;

/// Compute a topological execution order over `processors`, returned as
/// indices into the input slice.
///
/// The order is deterministic: unconstrained processors keep their
/// relative registration order among the ready set. Self-referential
/// constraints (a type ordered against itself) bind other instances of
/// the type, never the declaring instance.
pub(crate) fn sorted_order(
    processors: &[Box<dyn Processor>],
) -> Result<Vec<usize>, ScheduleError> {
    let n = processors.len();
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];

    for (i, processor) in processors.iter().enumerate() {
        let schedule = processor.schedule();
        for after in schedule.after_types() {
            for (j, other) in processors.iter().enumerate() {
                if j != i && other.type_key() == *after {
                    edges[j].push(i);
                    in_degree[i] += 1;
                }
            }
        }
        for before in schedule.before_types() {
            for (j, other) in processors.iter().enumerate() {
                if j != i && other.type_key() == *before {
                    edges[i].push(j);
                    in_degree[j] += 1;
                }
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_front() {
        order.push(i);
        for &j in &edges[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push_back(j);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        Err(ScheduleError::Cycle {
            names: (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| processors[i].name().to_string())
                .collect(),
        })
    }
}
