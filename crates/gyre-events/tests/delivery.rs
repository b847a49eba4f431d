//! Integration tests for dispatcher delivery semantics.
//!
//! Exercises TTL accounting across Action-driven revisits, chain
//! mutation from inside handlers, and the free-running loop's
//! cross-thread contract.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use gyre_core::{Action, EventKind, Subscriber, Ttl};
use gyre_events::Dispatcher;
use gyre_test_utils::Tremor;

#[test]
fn ttl_decrements_once_per_invocation_including_revisits() {
    let dispatcher = Dispatcher::new();
    let first_seen = Arc::new(Mutex::new(Vec::new()));
    let second_seen = Arc::new(Mutex::new(Vec::new()));

    {
        let first_seen = first_seen.clone();
        dispatcher.on(2, move |tremor: &mut Tremor| {
            first_seen.lock().unwrap().push(tremor.ttl.remaining());
            None
        });
    }
    {
        // Rewinds once, so the first handler runs twice.
        let second_seen = second_seen.clone();
        dispatcher.on(1, move |tremor: &mut Tremor| {
            second_seen.lock().unwrap().push(tremor.ttl.remaining());
            if second_seen.lock().unwrap().len() == 1 {
                Some(Action::prev(1))
            } else {
                Some(Action::stop())
            }
        });
    }

    let mut event = Tremor::new(1);
    event.ttl = Ttl::new(10);
    dispatcher.publish(event);
    dispatcher.update();

    // Each handler observes the budget before its own decrement, so the
    // recorded values march down by exactly one per invocation.
    assert_eq!(first_seen.lock().unwrap().as_slice(), &[10, 8]);
    assert_eq!(second_seen.lock().unwrap().as_slice(), &[9, 7]);
}

#[test]
fn handlers_can_resubscribe_without_deadlocking() {
    let dispatcher = Arc::new(Dispatcher::new());
    let late_invocations = Arc::new(AtomicUsize::new(0));

    {
        let dispatcher_handle = dispatcher.clone();
        let late_invocations = late_invocations.clone();
        dispatcher.on(0, move |_: &mut Tremor| {
            // Subscribing from inside a delivery takes effect for the
            // next event, not the one in flight.
            let late_invocations = late_invocations.clone();
            dispatcher_handle.on(0, move |_: &mut Tremor| {
                late_invocations.fetch_add(1, Ordering::SeqCst);
                None
            });
            None
        });
    }

    dispatcher.publish(Tremor::new(1));
    dispatcher.update();
    assert_eq!(late_invocations.load(Ordering::SeqCst), 0);

    dispatcher.publish(Tremor::new(2));
    dispatcher.update();
    assert_eq!(late_invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn unsubscribe_targets_declared_kind_only() {
    let dispatcher = Dispatcher::new();
    let catch_all_hits = Arc::new(AtomicUsize::new(0));

    let subscriber = {
        let catch_all_hits = catch_all_hits.clone();
        Subscriber::untyped(3, move |_| {
            catch_all_hits.fetch_add(1, Ordering::SeqCst);
            None
        })
    };
    dispatcher.subscribe(EventKind::any(), subscriber.clone());
    dispatcher.subscribe_to::<Tremor>(subscriber.clone());

    // Removing from the concrete kind must leave the catch-all entry.
    dispatcher.unsubscribe(EventKind::of::<Tremor>(), &subscriber);
    assert_eq!(dispatcher.subscriber_count(EventKind::of::<Tremor>()), 0);
    assert_eq!(dispatcher.subscriber_count(EventKind::any()), 1);

    dispatcher.publish(Tremor::new(1));
    dispatcher.update();
    assert_eq!(catch_all_hits.load(Ordering::SeqCst), 1);
}

#[test]
fn free_running_loop_delivers_cross_thread_publishes() {
    let dispatcher = Arc::new(Dispatcher::with_idle_poll(Duration::from_micros(200)));
    let total = Arc::new(AtomicUsize::new(0));
    {
        let total = total.clone();
        dispatcher.on(0, move |tremor: &mut Tremor| {
            total.fetch_add(tremor.magnitude as usize, Ordering::SeqCst);
            None
        });
    }

    let consumer = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || dispatcher.start())
    };
    while !dispatcher.is_running() {
        thread::yield_now();
    }

    let publishers: Vec<_> = (0..3)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    dispatcher.publish(Tremor::new(1));
                }
            })
        })
        .collect();
    for handle in publishers {
        handle.join().unwrap();
    }

    while total.load(Ordering::SeqCst) < 75 {
        thread::yield_now();
    }
    dispatcher.stop();
    consumer.join().unwrap();
    assert!(dispatcher.is_empty());
    assert_eq!(total.load(Ordering::SeqCst), 75);
}

#[test]
fn publish_before_subscribe_queues_without_loss() {
    let dispatcher = Dispatcher::new();
    dispatcher.publish(Tremor::new(7));
    assert_eq!(dispatcher.pending(), 1);

    let seen = Arc::new(AtomicUsize::new(0));
    {
        let seen = seen.clone();
        dispatcher.on(0, move |tremor: &mut Tremor| {
            seen.store(tremor.magnitude as usize, Ordering::SeqCst);
            None
        });
    }
    dispatcher.update();
    assert_eq!(seen.load(Ordering::SeqCst), 7);
}
