//! The [`Engine`]: one registry, one dispatcher, two cooperative loops.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use gyre_core::StepError;
use gyre_ecs::{Registry, TickMetrics};
use gyre_events::Dispatcher;

use crate::config::{ConfigError, EngineConfig};
use crate::loops::{dispatcher_loop, registry_loop};

/// Errors from engine lifecycle operations.
#[derive(Debug)]
pub enum EngineError {
    /// `start()` was called while the engine was already running.
    AlreadyRunning,
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Which loop failed to spawn.
        which: &'static str,
    },
    /// The registry loop exited with a tick fault.
    RegistryFault(StepError),
    /// A loop thread panicked (a handler or processor unwound).
    LoopPanicked {
        /// Which loop panicked.
        which: &'static str,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "engine is already running"),
            Self::ThreadSpawnFailed { which } => {
                write!(f, "failed to spawn {which} loop thread")
            }
            Self::RegistryFault(err) => write!(f, "registry loop faulted: {err}"),
            Self::LoopPanicked { which } => write!(f, "{which} loop panicked"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RegistryFault(err) => Some(err),
            _ => None,
        }
    }
}

/// The composition root and sole externally visible entry point for
/// starting and stopping the runtime.
///
/// Two usage modes:
///
/// - **Free-running**: [`start()`](Engine::start) spawns the registry
///   tick loop and the dispatcher delivery loop on their own threads;
///   [`stop()`](Engine::stop) signals both and waits for them to exit.
/// - **Caller-driven**: repeatedly call [`update()`](Engine::update) to
///   advance both by one step from your own loop: fully deterministic,
///   no threads involved.
///
/// # Examples
///
/// ```
/// use gyre_core::components;
/// use gyre_engine::Engine;
///
/// let mut engine = Engine::new();
/// let entity = engine.with_registry(|registry| registry.create_entity(components![]));
/// engine.update().unwrap();
/// assert!(engine.with_registry(|registry| registry.entity_exists(entity)));
/// ```
pub struct Engine {
    registry: Arc<Mutex<Registry>>,
    dispatcher: Arc<Dispatcher>,
    config: EngineConfig,
    registry_running: Arc<AtomicBool>,
    dispatcher_running: Arc<AtomicBool>,
    registry_thread: Option<JoinHandle<Result<(), StepError>>>,
    dispatcher_thread: Option<JoinHandle<()>>,
}

impl Engine {
    /// An engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::assemble(EngineConfig::default())
    }

    /// An engine with a validated configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config))
    }

    fn assemble(config: EngineConfig) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
            dispatcher: Arc::new(Dispatcher::with_idle_poll(config.idle_poll)),
            config,
            registry_running: Arc::new(AtomicBool::new(false)),
            dispatcher_running: Arc::new(AtomicBool::new(false)),
            registry_thread: None,
            dispatcher_thread: None,
        }
    }

    /// The shared registry. Lock it to query or mutate between ticks.
    #[must_use]
    pub fn registry(&self) -> &Arc<Mutex<Registry>> {
        &self.registry
    }

    /// Run `f` with the registry locked.
    pub fn with_registry<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.registry.lock().unwrap())
    }

    /// The shared dispatcher. Publish and subscribe from any thread.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Whether `start()` has been called without a matching `stop()`.
    ///
    /// Remains `true` after a loop fault until `stop()` collects the
    /// fault.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.registry_thread.is_some() || self.dispatcher_thread.is_some()
    }

    /// Launch the two free-running loops.
    ///
    /// Both run until [`stop()`](Engine::stop); the registry loop also
    /// exits early if a processor faults, in which case `stop()` reports
    /// the fault.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        log::info!("engine starting");

        // Flags go up before the threads exist, so a stop() racing a
        // fresh start() can never be missed by a loop.
        self.registry_running.store(true, Ordering::Release);
        self.dispatcher_running.store(true, Ordering::Release);

        let registry_thread = thread::Builder::new()
            .name("gyre-registry".into())
            .spawn({
                let registry = self.registry.clone();
                let running = self.registry_running.clone();
                let tick_interval = self.config.tick_interval;
                move || registry_loop(registry, running, tick_interval)
            })
            .map_err(|_| EngineError::ThreadSpawnFailed { which: "registry" })?;

        let dispatcher_thread = match thread::Builder::new().name("gyre-dispatcher".into()).spawn({
            let dispatcher = self.dispatcher.clone();
            let running = self.dispatcher_running.clone();
            let idle_poll = self.config.idle_poll;
            move || dispatcher_loop(dispatcher, running, idle_poll)
        }) {
            Ok(handle) => handle,
            Err(_) => {
                // Roll the registry loop back so the engine stays stopped.
                self.registry_running.store(false, Ordering::Release);
                let _ = registry_thread.join();
                return Err(EngineError::ThreadSpawnFailed {
                    which: "dispatcher",
                });
            }
        };

        self.registry_thread = Some(registry_thread);
        self.dispatcher_thread = Some(dispatcher_thread);
        Ok(())
    }

    /// Signal both loops to stop and wait for each to exit.
    ///
    /// In-flight ticks and deliveries run to completion. Reports a
    /// registry fault or a panicked loop; stopping an engine that was
    /// never started is a no-op.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        if !self.is_running() {
            return Ok(());
        }
        log::info!("engine stopping");
        self.registry_running.store(false, Ordering::Release);
        self.dispatcher_running.store(false, Ordering::Release);

        let mut result = Ok(());
        if let Some(handle) = self.registry_thread.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(fault)) => result = Err(EngineError::RegistryFault(fault)),
                Err(_) => result = Err(EngineError::LoopPanicked { which: "registry" }),
            }
        }
        if let Some(handle) = self.dispatcher_thread.take() {
            if handle.join().is_err() {
                result = Err(EngineError::LoopPanicked {
                    which: "dispatcher",
                });
            }
        }
        result
    }

    /// Advance both halves once: one registry tick, then one dispatcher
    /// delivery attempt.
    ///
    /// For embedding in a caller-driven loop instead of the free-running
    /// one; do not mix with `start()`.
    pub fn update(&mut self) -> Result<TickMetrics, StepError> {
        let metrics = self.registry.lock().unwrap().update()?;
        self.dispatcher.update();
        Ok(metrics)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                log::warn!("engine dropped with faulted loop: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gyre_core::components;
    use gyre_test_utils::{Health, RecordingProcessor};
    use std::time::Duration;

    #[test]
    fn caller_driven_update_advances_one_tick() {
        let mut engine = Engine::new();
        let trace = Arc::new(Mutex::new(Vec::new()));
        engine.with_registry(|registry| {
            registry
                .add_processor(Box::new(RecordingProcessor::new("step", trace.clone())))
                .unwrap();
            registry.create_entity(components![Health::new(1)]);
        });

        let metrics = engine.update().unwrap();
        assert_eq!(metrics.tick.0, 1);
        assert_eq!(trace.lock().unwrap().len(), 1);
    }

    #[test]
    fn double_start_is_rejected() {
        let mut engine = Engine::new();
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyRunning)));
        engine.stop().unwrap();
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let mut engine = Engine::new();
        assert!(engine.stop().is_ok());
    }

    #[test]
    fn start_stop_round_trip_makes_progress() {
        let mut engine = Engine::with_config(EngineConfig {
            tick_interval: Duration::from_micros(100),
            ..EngineConfig::default()
        })
        .unwrap();

        engine.start().unwrap();
        loop {
            let ticked = engine.with_registry(|registry| registry.tick().0);
            if ticked >= 3 {
                break;
            }
            std::thread::yield_now();
        }
        engine.stop().unwrap();
        assert!(!engine.is_running());
    }
}
