//! Thread bodies for the engine's two cooperative loops.
//!
//! Each loop checks its stop signal at the top of every iteration, so a
//! stop request never interrupts a tick or a delivery in flight. The
//! engine sets each flag before spawning its thread and clears it to
//! stop, which keeps start/stop free of signal races.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use gyre_core::StepError;
use gyre_ecs::Registry;
use gyre_events::Dispatcher;

/// Drive `registry` until `running` clears.
///
/// One iteration = lock, tick, unlock, sleep `tick_interval`; external
/// callers get the lock between ticks. A tick fault stops the loop,
/// clears the flag, and is returned to whoever joins the thread; there
/// is no automatic retry.
pub(crate) fn registry_loop(
    registry: Arc<Mutex<Registry>>,
    running: Arc<AtomicBool>,
    tick_interval: Duration,
) -> Result<(), StepError> {
    log::info!("registry loop started");
    while running.load(Ordering::Acquire) {
        let result = registry.lock().unwrap().update();
        if let Err(err) = result {
            log::error!("registry loop faulted: {err}");
            running.store(false, Ordering::Release);
            return Err(err);
        }
        thread::sleep(tick_interval);
    }
    log::info!("registry loop stopped");
    Ok(())
}

/// Drain `dispatcher` one event at a time until `running` clears.
///
/// Blocks at most `idle_poll` per iteration on an empty queue, so the
/// stop flag is observed promptly.
pub(crate) fn dispatcher_loop(
    dispatcher: Arc<Dispatcher>,
    running: Arc<AtomicBool>,
    idle_poll: Duration,
) {
    log::info!("dispatcher loop started");
    while running.load(Ordering::Acquire) {
        dispatcher.update_timeout(idle_poll);
    }
    log::info!("dispatcher loop stopped");
}
