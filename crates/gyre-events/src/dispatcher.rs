//! Event queue and Action-driven delivery.
//!
//! One [`Dispatcher`] owns a single unbounded FIFO queue and a table of
//! per-kind subscriber chains. Publishers enqueue from any thread without
//! blocking; one consumer (the dispatcher loop, or a caller-driven
//! `update()`) dequeues one event per iteration and walks its chains.
//!
//! # Locking
//!
//! The subscriber table lock is held only for list mutation and the
//! pre-delivery sort; the chain is snapshotted before handlers run, so a
//! handler may subscribe, unsubscribe, or publish without deadlocking.
//! Chain changes made mid-delivery are observed by the *next* delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use indexmap::IndexMap;
use smallvec::SmallVec;

use gyre_core::{Action, Event, EventKind, Subscriber};

/// How long the free-running loop waits on an empty queue before
/// re-checking its stop flag.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(1);

/// The event queue plus per-kind subscriber chains.
///
/// All methods take `&self`; share the dispatcher across threads behind
/// an `Arc`. Exactly one logical consumer should drive delivery at a
/// time: either the free-running [`start()`](Dispatcher::start) loop or
/// caller-driven [`update()`](Dispatcher::update) stepping.
///
/// # Examples
///
/// ```
/// use gyre_core::{Action, Event, Ttl};
/// use gyre_events::Dispatcher;
///
/// struct Ping { ttl: Ttl }
/// impl Event for Ping {
///     fn ttl(&self) -> &Ttl { &self.ttl }
///     fn ttl_mut(&mut self) -> &mut Ttl { &mut self.ttl }
/// }
///
/// let dispatcher = Dispatcher::new();
/// dispatcher.on(0, |_ping: &mut Ping| Some(Action::stop()));
/// dispatcher.publish(Ping { ttl: Ttl::default() });
/// assert!(dispatcher.update());
/// assert!(!dispatcher.update()); // queue drained
/// ```
pub struct Dispatcher {
    queue_tx: Sender<Box<dyn Event>>,
    queue_rx: Mutex<Receiver<Box<dyn Event>>>,
    subscribers: Mutex<IndexMap<EventKind, Vec<Subscriber>>>,
    running: AtomicBool,
    idle_poll: Duration,
}

impl Dispatcher {
    /// A dispatcher with the default idle poll interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_idle_poll(DEFAULT_IDLE_POLL)
    }

    /// A dispatcher whose free-running loop re-checks its stop flag every
    /// `idle_poll` while the queue is empty.
    #[must_use]
    pub fn with_idle_poll(idle_poll: Duration) -> Self {
        let (queue_tx, queue_rx) = unbounded();
        Self {
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            subscribers: Mutex::new(IndexMap::new()),
            running: AtomicBool::new(false),
            idle_poll,
        }
    }

    // ── Subscriptions ───────────────────────────────────────────────

    /// Append `subscriber` to `kind`'s chain.
    ///
    /// Duplicates are allowed; unsubscribe first to replace.
    pub fn subscribe(&self, kind: EventKind, subscriber: Subscriber) {
        let mut table = self.subscribers.lock().unwrap();
        table.entry(kind).or_default().push(subscriber);
    }

    /// Append `subscriber` to the chain of event type `E`.
    pub fn subscribe_to<E: Event>(&self, subscriber: Subscriber) {
        self.subscribe(EventKind::of::<E>(), subscriber);
    }

    /// Remove every entry in `kind`'s chain matching `subscriber`'s
    /// (handler, priority) identity. Other kinds are untouched, including
    /// subtypes delivering through this kind.
    pub fn unsubscribe(&self, kind: EventKind, subscriber: &Subscriber) {
        let mut table = self.subscribers.lock().unwrap();
        if let Some(chain) = table.get_mut(&kind) {
            chain.retain(|s| !s.matches(subscriber));
            if chain.is_empty() {
                table.shift_remove(&kind);
            }
        }
    }

    /// Subscribe a typed handler to event type `E` and return the
    /// subscriber for a later [`unsubscribe`](Dispatcher::unsubscribe).
    pub fn on<E, F>(&self, priority: i32, handler: F) -> Subscriber
    where
        E: Event,
        F: Fn(&mut E) -> Option<Action> + Send + Sync + 'static,
    {
        let subscriber = Subscriber::of(priority, handler);
        self.subscribe_to::<E>(subscriber.clone());
        subscriber
    }

    /// [`on`](Dispatcher::on) with a typed filter: the handler only runs
    /// for events the filter accepts.
    pub fn on_filtered<E, F, P>(&self, priority: i32, filter: P, handler: F) -> Subscriber
    where
        E: Event,
        F: Fn(&mut E) -> Option<Action> + Send + Sync + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let subscriber = Subscriber::of(priority, handler).with_filter(filter);
        self.subscribe_to::<E>(subscriber.clone());
        subscriber
    }

    /// Number of subscribers currently registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .get(&kind)
            .map_or(0, Vec::len)
    }

    // ── Queue ───────────────────────────────────────────────────────

    /// Enqueue `event`. Never blocks; the queue is unbounded and safe to
    /// publish into from any thread.
    pub fn publish<E: Event>(&self, event: E) {
        self.publish_boxed(Box::new(event));
    }

    /// Type-erased variant of [`publish`](Dispatcher::publish).
    pub fn publish_boxed(&self, event: Box<dyn Event>) {
        log::trace!("queued {}", event.name());
        // The receiver lives inside `self`, so the channel cannot be
        // disconnected while a publisher holds `&self`.
        let _ = self.queue_tx.send(event);
    }

    /// Number of events waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue_tx.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    // ── Delivery ────────────────────────────────────────────────────

    /// Dequeue and deliver one event without blocking.
    ///
    /// Returns `false` on an empty queue; that is a normal outcome, not an
    /// error.
    pub fn update(&self) -> bool {
        let next = self.queue_rx.lock().unwrap().try_recv();
        match next {
            Ok(mut event) => {
                self.deliver(event.as_mut());
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    /// Dequeue and deliver one event, waiting up to `timeout` for one to
    /// arrive. The bounded wait keeps a blocking consumer cancellable.
    pub fn update_timeout(&self, timeout: Duration) -> bool {
        let next = self.queue_rx.lock().unwrap().recv_timeout(timeout);
        match next {
            Ok(mut event) => {
                self.deliver(event.as_mut());
                true
            }
            Err(_) => false,
        }
    }

    // ── Free-running loop ───────────────────────────────────────────

    /// Run the delivery loop on the calling thread until
    /// [`stop()`](Dispatcher::stop).
    ///
    /// The loop blocks at most one idle-poll interval per iteration, so a
    /// stop request is observed promptly and in-flight deliveries always
    /// complete.
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
        log::info!("dispatcher loop started");
        while self.running.load(Ordering::Acquire) {
            self.update_timeout(self.idle_poll);
        }
        log::info!("dispatcher loop stopped");
    }

    /// Request the free-running loop to stop at its next iteration.
    /// Safe to call from any thread.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the free-running loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Deliver one event to its own kind, each declared ancestor kind in
    /// order, and finally the catch-all kind. Stops early if the TTL
    /// budget runs out.
    fn deliver(&self, event: &mut dyn Event) {
        let mut kinds: SmallVec<[EventKind; 4]> = SmallVec::new();
        kinds.push(EventKind::of_val(event));
        for parent in event.parents() {
            if !kinds.contains(&parent) {
                kinds.push(parent);
            }
        }
        let any = EventKind::any();
        if !kinds.contains(&any) {
            kinds.push(any);
        }

        log::trace!("delivering {}", event.name());
        for kind in kinds {
            if !self.handle_event(kind, event) {
                log::trace!("{} expired mid-delivery", event.name());
                break;
            }
        }
    }

    /// Walk one kind's chain. Returns `false` when the event's TTL is
    /// exhausted and the remaining delivery should be abandoned.
    fn handle_event(&self, kind: EventKind, event: &mut dyn Event) -> bool {
        if event.ttl().is_expired() {
            return false;
        }

        let chain: Vec<Subscriber> = {
            let mut table = self.subscribers.lock().unwrap();
            match table.get_mut(&kind) {
                None => return true,
                Some(chain) => {
                    // Descending priority; the sort is stable, so equal
                    // priorities keep their relative registration order.
                    chain.sort_by(|a, b| b.priority().cmp(&a.priority()));
                    chain.clone()
                }
            }
        };

        let len = chain.len() as i64;
        let mut cursor: i64 = 0;
        while cursor < len {
            let subscriber = &chain[cursor as usize];

            if let Some(filter) = subscriber.filter() {
                if !filter(event) {
                    // A rejected entry advances the cursor by exactly one
                    // and leaves the TTL untouched.
                    cursor += 1;
                    continue;
                }
            }

            cursor = match (subscriber.handler())(event) {
                Some(action) => cursor.saturating_add(action.offset()).clamp(0, len),
                None => cursor + 1,
            };

            if event.ttl_mut().decrement() == 0 {
                return false;
            }
        }
        true
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
