//! The [`Event`] contract, event kinds, and the time-to-live counter.
//!
//! Events are published into the dispatcher's FIFO queue and delivered to
//! prioritized subscriber chains. Each event carries a [`Ttl`] budget that
//! is consumed once per handler invocation, and an explicit, statically
//! declared lineage of ancestor kinds that replaces runtime type
//! reflection: the dispatcher delivers an event to the subscriber list of
//! its own kind, then to each ancestor kind in declared order, then to the
//! catch-all [`EventKind::any()`] list.

use std::any::{Any, TypeId};
use std::fmt;

use smallvec::SmallVec;

/// Ordered ancestor kinds of an event type, most-derived first.
///
/// Small inline vector: lineages deeper than four kinds spill to the heap
/// transparently.
pub type EventLineage = SmallVec<[EventKind; 4]>;

/// Identifies an event kind (a concrete event type, one of its declared
/// ancestors, or the catch-all root).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventKind(TypeId);

/// Marker behind [`EventKind::any()`]. Never instantiated.
struct AnyEventMarker;

impl EventKind {
    /// The kind of a statically known event type.
    #[must_use]
    pub fn of<E: Event>() -> Self {
        Self(TypeId::of::<E>())
    }

    /// The kind of a type-erased event value.
    #[must_use]
    pub fn of_val(event: &dyn Event) -> Self {
        Self((event as &dyn Any).type_id())
    }

    /// The catch-all root kind.
    ///
    /// Every event's delivery chain implicitly terminates here, so a
    /// subscriber registered under `EventKind::any()` observes every
    /// published event (after all more specific subscriber lists).
    #[must_use]
    pub fn any() -> Self {
        Self(TypeId::of::<AnyEventMarker>())
    }
}

/// Remaining delivery budget of an event.
///
/// Decremented once per non-filtered handler invocation; when it reaches
/// zero the dispatcher abandons the rest of the delivery. This bounds
/// re-delivery loops built from [`Action::go_start()`](crate::Action::go_start)
/// and [`Action::prev()`](crate::Action::prev).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ttl(u32);

impl Ttl {
    /// Budget given to events that do not choose one explicitly.
    pub const DEFAULT: u32 = 64;

    /// A counter with the given budget.
    #[must_use]
    pub const fn new(budget: u32) -> Self {
        Self(budget)
    }

    /// Remaining budget.
    #[must_use]
    pub const fn remaining(self) -> u32 {
        self.0
    }

    /// Whether the budget is spent.
    #[must_use]
    pub const fn is_expired(self) -> bool {
        self.0 == 0
    }

    /// Consume one unit, saturating at zero. Returns the remaining budget.
    pub fn decrement(&mut self) -> u32 {
        self.0 = self.0.saturating_sub(1);
        self.0
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The event contract.
///
/// Concrete events are plain structs embedding a [`Ttl`] field; payload
/// shape is entirely up to the event type. Ancestor kinds, if any, are
/// declared by overriding [`parents()`](Event::parents) with a static
/// ordered list; there is no reflection over a type hierarchy.
///
/// ```
/// use gyre_core::{Event, EventKind, EventLineage, Ttl};
///
/// struct DamageEvent {
///     ttl: Ttl,
/// }
///
/// impl Event for DamageEvent {
///     fn ttl(&self) -> &Ttl { &self.ttl }
///     fn ttl_mut(&mut self) -> &mut Ttl { &mut self.ttl }
/// }
///
/// /// Fire damage specializes damage: subscribers to `DamageEvent`
/// /// also observe every `FireDamageEvent`.
/// struct FireDamageEvent {
///     ttl: Ttl,
/// }
///
/// impl Event for FireDamageEvent {
///     fn ttl(&self) -> &Ttl { &self.ttl }
///     fn ttl_mut(&mut self) -> &mut Ttl { &mut self.ttl }
///     fn parents(&self) -> EventLineage {
///         [EventKind::of::<DamageEvent>()].into_iter().collect()
///     }
/// }
///
/// let fire = FireDamageEvent { ttl: Ttl::default() };
/// assert_eq!(fire.parents().len(), 1);
/// ```
pub trait Event: Any + Send {
    /// Human-readable type name for diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Remaining delivery budget.
    fn ttl(&self) -> &Ttl;

    /// Mutable access to the delivery budget. The dispatcher is the only
    /// expected caller.
    fn ttl_mut(&mut self) -> &mut Ttl;

    /// Declared ancestor kinds, most-derived first, excluding this type's
    /// own kind and the implicit catch-all root.
    fn parents(&self) -> EventLineage {
        EventLineage::new()
    }
}

impl dyn Event {
    /// Returns `true` if the event is of concrete type `E`.
    #[must_use]
    pub fn is<E: Event>(&self) -> bool {
        EventKind::of_val(self) == EventKind::of::<E>()
    }

    /// Borrow the event as concrete type `E`, if it is one.
    #[must_use]
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        (self as &dyn Any).downcast_ref::<E>()
    }

    /// Mutably borrow the event as concrete type `E`, if it is one.
    #[must_use]
    pub fn downcast_mut<E: Event>(&mut self) -> Option<&mut E> {
        (self as &mut dyn Any).downcast_mut::<E>()
    }
}
