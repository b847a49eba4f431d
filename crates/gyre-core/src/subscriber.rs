//! The [`Subscriber`] triple binding a handler, an optional filter, and a
//! delivery priority to an event kind.

use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::event::Event;

/// Type-erased handler closure.
///
/// Receives the event mutably and may return an [`Action`] directing the
/// dispatcher's cursor; returning `None` advances the cursor by one.
pub type Handler = Arc<dyn Fn(&mut dyn Event) -> Option<Action> + Send + Sync>;

/// Type-erased filter closure. Returning `false` bypasses the handler for
/// this event without consuming TTL.
pub type FilterFn = Arc<dyn Fn(&dyn Event) -> bool + Send + Sync>;

/// Priority used by the convenience constructors when the caller does not
/// care about ordering.
pub const DEFAULT_PRIORITY: i32 = -1;

/// A prioritized subscription to one event kind.
///
/// Identity for subscribe/unsubscribe purposes is the (handler allocation,
/// priority) pair: keep a clone of the subscriber you registered and pass
/// it back to unsubscribe. Cloning shares the underlying closures.
///
/// ```
/// use gyre_core::{Action, Event, Subscriber, Ttl};
///
/// struct Ping { ttl: Ttl }
/// impl Event for Ping {
///     fn ttl(&self) -> &Ttl { &self.ttl }
///     fn ttl_mut(&mut self) -> &mut Ttl { &mut self.ttl }
/// }
///
/// let sub = Subscriber::of(5, |_ping: &mut Ping| Some(Action::stop()));
/// assert_eq!(sub.priority(), 5);
/// assert!(sub.matches(&sub.clone()));
/// ```
#[derive(Clone)]
pub struct Subscriber {
    handler: Handler,
    filter: Option<FilterFn>,
    priority: i32,
}

impl Subscriber {
    /// A subscriber whose handler observes events of concrete type `E`.
    ///
    /// If the delivered event is not an `E` (possible when the subscriber
    /// is registered under an ancestor kind), the handler declines: the
    /// cursor advances by one.
    pub fn of<E, F>(priority: i32, handler: F) -> Self
    where
        E: Event,
        F: Fn(&mut E) -> Option<Action> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(move |event: &mut dyn Event| {
                event.downcast_mut::<E>().and_then(&handler)
            }),
            filter: None,
            priority,
        }
    }

    /// A subscriber whose handler observes the type-erased event.
    ///
    /// Use this for subscriptions on ancestor kinds or on
    /// [`EventKind::any()`](crate::EventKind::any), where more than one
    /// concrete type flows through the chain.
    pub fn untyped<F>(priority: i32, handler: F) -> Self
    where
        F: Fn(&mut dyn Event) -> Option<Action> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            filter: None,
            priority,
        }
    }

    /// Attach a filter over concrete type `E`. Events of another concrete
    /// type are rejected.
    #[must_use]
    pub fn with_filter<E, F>(mut self, filter: F) -> Self
    where
        E: Event,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(move |event: &dyn Event| {
            event.downcast_ref::<E>().is_some_and(&filter)
        }));
        self
    }

    /// Attach a type-erased filter.
    #[must_use]
    pub fn with_untyped_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&dyn Event) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Delivery priority; higher runs earlier.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The handler closure.
    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// The filter closure, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&FilterFn> {
        self.filter.as_ref()
    }

    /// Whether `other` names the same subscription: same handler
    /// allocation and same priority.
    #[must_use]
    pub fn matches(&self, other: &Subscriber) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler) && self.priority == other.priority
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
