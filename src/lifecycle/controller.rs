//! Lifecycle controller and its worker thread.
//!
//! # Responsibilities
//! - Accept reload/shutdown/panic requests from any thread without blocking
//! - Serialize them through the lifecycle queue
//! - Run the shutdown sequence once, on the worker thread:
//!   stop the signal loop → stop subsystems in declared order → exit
//!
//! # Design Decisions
//! - Exactly one worker ever consumes the queue
//! - Subsystem failures during shutdown are not retried; the watchdog alarm
//!   armed by `panic()` is the only bound on a hang
//! - Reload is accepted and logged, nothing more

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};
use crate::lifecycle::queue::{EventConsumer, LifecycleEvent, LifecycleQueue};
use crate::lifecycle::signals::{LifecycleRequests, SignalBridge};
use crate::lifecycle::subsystem::Subsystem;
use crate::lifecycle::watchdog::{Alarm, ProcessAlarm, PANIC_TIMEOUT};

/// Name of the lifecycle worker thread.
pub const WORKER_THREAD_NAME: &str = "lifecycle";

/// Where the controller is in its lifecycle.
///
/// There is no `Terminated` variant: once the process has exited nothing
/// is left to observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Running = 0,
    ShuttingDown = 1,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LifecycleState::Running,
            _ => LifecycleState::ShuttingDown,
        }
    }
}

type Terminate = Box<dyn Fn(i32) + Send + Sync>;

/// Owns the queue, the subsystems and the shutdown protocol.
pub struct Controller {
    queue: LifecycleQueue,
    bridge: Arc<SignalBridge>,
    subsystems: Vec<Arc<dyn Subsystem>>,
    alarm: Box<dyn Alarm>,
    terminate: Terminate,
    state: AtomicU8,
}

/// Builder for [`Controller`].
pub struct ControllerBuilder {
    bridge: Arc<SignalBridge>,
    subsystems: Vec<Arc<dyn Subsystem>>,
    alarm: Box<dyn Alarm>,
    terminate: Terminate,
}

impl ControllerBuilder {
    /// Append a subsystem. Shutdown runs in the order subsystems are added,
    /// so add listener-facing ones before the backends they feed.
    pub fn subsystem(mut self, subsystem: Arc<dyn Subsystem>) -> Self {
        self.subsystems.push(subsystem);
        self
    }

    /// Replace the watchdog alarm (defaults to [`ProcessAlarm`]).
    pub fn alarm(mut self, alarm: impl Alarm + 'static) -> Self {
        self.alarm = Box::new(alarm);
        self
    }

    /// Replace process termination (defaults to [`std::process::exit`]).
    pub fn on_terminate(mut self, terminate: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.terminate = Box::new(terminate);
        self
    }

    pub fn build(self) -> Arc<Controller> {
        Arc::new(Controller {
            queue: LifecycleQueue::new(),
            bridge: self.bridge,
            subsystems: self.subsystems,
            alarm: self.alarm,
            terminate: self.terminate,
            state: AtomicU8::new(LifecycleState::Running as u8),
        })
    }
}

impl Controller {
    pub fn builder(bridge: Arc<SignalBridge>) -> ControllerBuilder {
        ControllerBuilder {
            bridge,
            subsystems: Vec::new(),
            alarm: Box::new(ProcessAlarm),
            terminate: Box::new(|code| std::process::exit(code)),
        }
    }

    /// Ask the worker to reload. Never blocks.
    pub fn reload(&self) {
        self.queue.push(LifecycleEvent::Reload);
    }

    /// Ask the worker to shut down. Never blocks.
    pub fn shutdown(&self) {
        self.queue.push(LifecycleEvent::Shutdown);
    }

    /// Arm the watchdog, then ask for shutdown.
    ///
    /// The process is gone within [`PANIC_TIMEOUT`] whether or not the
    /// shutdown sequence finishes.
    pub fn panic(&self) {
        self.alarm.arm(PANIC_TIMEOUT);
        self.shutdown();
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn bridge(&self) -> &Arc<SignalBridge> {
        &self.bridge
    }

    /// Subsystems in shutdown order.
    pub fn subsystems(&self) -> &[Arc<dyn Subsystem>] {
        &self.subsystems
    }

    /// Start the worker thread. Fails on a second call.
    pub fn spawn_worker(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        let events = self.queue.take_consumer().ok_or(Error::WorkerAlreadySpawned)?;
        let controller = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || controller.run(events))?;
        Ok(handle)
    }

    /// Worker loop: process events in order until shutdown.
    ///
    /// Returns only if the terminate hook returns, which the default one
    /// does not.
    pub fn run(&self, mut events: EventConsumer) {
        tracing::debug!("Lifecycle worker running");
        while let Some(event) = events.pop() {
            match event {
                LifecycleEvent::Reload => {
                    tracing::info!("Reload requested; reload is not implemented, ignoring");
                }
                LifecycleEvent::Shutdown => {
                    if self.begin_shutdown() {
                        self.shut_down();
                        return;
                    }
                }
            }
        }
    }

    fn begin_shutdown(&self) -> bool {
        let entered = self
            .state
            .compare_exchange(
                LifecycleState::Running as u8,
                LifecycleState::ShuttingDown as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if !entered {
            tracing::debug!("Shutdown already in progress");
        }
        entered
    }

    fn shut_down(&self) {
        tracing::info!(subsystems = self.subsystems.len(), "Shutting down");

        if let Err(e) = self.bridge.request_loop_exit() {
            tracing::error!(error = %e, "Failed to stop the signal loop, continuing shutdown");
        }

        for subsystem in &self.subsystems {
            tracing::info!(subsystem = subsystem.name(), "Stopping subsystem");
            subsystem.shutdown();
            tracing::debug!(subsystem = subsystem.name(), "Subsystem stopped");
        }

        tracing::info!("Shutdown complete");
        (self.terminate)(0);
    }
}

impl LifecycleRequests for Controller {
    fn reload(&self) {
        Controller::reload(self);
    }

    fn shutdown(&self) {
        Controller::shutdown(self);
    }
}
