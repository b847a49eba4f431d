//! The [`Processor`] trait and [`Schedule`] ordering declaration.
//!
//! Processors are per-tick behavior units executed in dependency order.
//! They declare ordering constraints at registration through
//! [`schedule()`](Processor::schedule); the registry validates the
//! resulting graph and rejects cycles.

use std::any::{Any, TypeId};

use gyre_core::ProcessError;

use crate::registry::Registry;

/// Ordering constraints a processor declares against other processor
/// types.
///
/// Constraints bind *types*, not instances: `after::<A>()` orders this
/// processor after every currently registered instance of `A`, and
/// constraints against types that are not registered are inert until an
/// instance appears.
///
/// # Examples
///
/// ```
/// use gyre_ecs::{Processor, Registry, Schedule};
/// use gyre_core::ProcessError;
///
/// struct Movement;
/// impl Processor for Movement {
///     fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> { Ok(()) }
/// }
///
/// struct Collision;
/// impl Processor for Collision {
///     fn schedule(&self) -> Schedule {
///         Schedule::new().after::<Movement>()
///     }
///     fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> { Ok(()) }
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Schedule {
    before: Vec<TypeId>,
    after: Vec<TypeId>,
}

impl Schedule {
    /// An empty schedule: no ordering constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// This processor must run strictly before every instance of `P`.
    #[must_use]
    pub fn before<P: Processor>(mut self) -> Self {
        self.before.push(TypeId::of::<P>());
        self
    }

    /// This processor must run strictly after every instance of `P`.
    #[must_use]
    pub fn after<P: Processor>(mut self) -> Self {
        self.after.push(TypeId::of::<P>());
        self
    }

    /// Types this processor must precede.
    #[must_use]
    pub fn before_types(&self) -> &[TypeId] {
        &self.before
    }

    /// Types this processor must follow.
    #[must_use]
    pub fn after_types(&self) -> &[TypeId] {
        &self.after
    }
}

/// A unit of per-tick behavior operating over the registry.
///
/// Stateless with respect to the framework; any state a processor keeps
/// is private to the instance. The registry calls
/// [`process()`](Processor::process) exactly once per tick, in an order
/// satisfying every registered schedule.
pub trait Processor: Any + Send {
    /// Human-readable name for error reporting and logging.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Ordering constraints, consulted whenever the processor set changes.
    fn schedule(&self) -> Schedule {
        Schedule::new()
    }

    /// Execute one tick against the registry.
    ///
    /// Recoverable data conditions (a missing component, an empty query)
    /// should be handled inside; an `Err` aborts the tick and surfaces to
    /// the loop driver.
    fn process(&mut self, registry: &mut Registry) -> Result<(), ProcessError>;
}

impl dyn Processor {
    /// Returns `true` if this processor is of concrete type `P`.
    #[must_use]
    pub fn is<P: Processor>(&self) -> bool {
        self.type_key() == TypeId::of::<P>()
    }

    /// Borrow the processor as concrete type `P`, if it is one.
    #[must_use]
    pub fn downcast_ref<P: Processor>(&self) -> Option<&P> {
        (self as &dyn Any).downcast_ref::<P>()
    }

    /// The [`TypeId`] of the concrete processor value.
    #[must_use]
    pub fn type_key(&self) -> TypeId {
        (self as &dyn Any).type_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    impl Processor for A {
        fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    struct B;
    impl Processor for B {
        fn process(&mut self, _: &mut Registry) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    #[test]
    fn schedule_collects_constraint_types() {
        let schedule = Schedule::new().before::<A>().after::<B>().after::<A>();
        assert_eq!(schedule.before_types(), &[TypeId::of::<A>()]);
        assert_eq!(
            schedule.after_types(),
            &[TypeId::of::<B>(), TypeId::of::<A>()]
        );
    }

    #[test]
    fn dyn_downcast_identifies_concrete_type() {
        let boxed: Box<dyn Processor> = Box::new(A);
        assert!(boxed.is::<A>());
        assert!(!boxed.is::<B>());
        assert!(boxed.downcast_ref::<A>().is_some());
        assert!(boxed.name().ends_with("::A"));
    }
}
