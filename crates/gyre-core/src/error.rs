//! Error types for the Gyre runtime, organized by subsystem:
//! registry data operations, processor scheduling, and tick execution.

use std::error::Error;
use std::fmt;

use crate::id::Entity;

/// Errors from imperative registry data operations.
///
/// Lookups never produce these: a missing component reads as `None` or an
/// empty iterator. Only the imperative remove fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The entity does not currently hold a component of the requested type.
    ComponentNotFound {
        /// The entity the removal targeted.
        entity: Entity,
        /// Type name of the missing component.
        component: &'static str,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ComponentNotFound { entity, component } => {
                write!(f, "entity {entity} has no {component} component")
            }
        }
    }
}

impl Error for RegistryError {}

/// Errors from the processor dependency sort.
///
/// Fatal to the `add_processor` call that triggered the rebuild; the
/// registry keeps its pre-call processor set and order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// The before/after constraints do not form a DAG.
    Cycle {
        /// Names of the processors that could not be placed.
        names: Vec<String>,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { names } => {
                write!(
                    f,
                    "processor dependency cycle involving: {}",
                    names.join(", ")
                )
            }
        }
    }
}

impl Error for ScheduleError {}

/// Errors from an individual processor's `process()` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessError {
    /// A registry operation the processor relied on failed.
    Registry(RegistryError),
    /// The processor's own logic failed.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(err) => write!(f, "registry operation failed: {err}"),
            Self::Failed { reason } => write!(f, "{reason}"),
        }
    }
}

impl Error for ProcessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(err) => Some(err),
            Self::Failed { .. } => None,
        }
    }
}

impl From<RegistryError> for ProcessError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

/// Errors from one registry tick (`update()`).
///
/// Recoverable data errors never surface here; a tick fails only when a
/// processor itself faults, and the embedding application decides whether
/// to crash or restart the loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// A processor returned an error during execution.
    ProcessorFailed {
        /// Name of the failing processor.
        name: String,
        /// The underlying processor error.
        reason: ProcessError,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessorFailed { name, reason } => {
                write!(f, "processor '{name}' failed: {reason}")
            }
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ProcessorFailed { reason, .. } => Some(reason),
        }
    }
}
