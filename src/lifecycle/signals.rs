//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP, SIGUSR1)
//! - Translate signals to lifecycle requests
//! - Run the blocking wait loop on the designated signal-handling thread
//! - Let another thread stop that loop and wait until it has unwound
//!
//! # Design Decisions
//! - signal-hook's self-pipe does the async-signal-safe part; dispatch runs
//!   as ordinary code on the waiting thread and only enqueues
//! - SIGTERM/SIGINT request shutdown, SIGHUP requests reload
//! - SIGUSR1 is internal: the process sends it to itself to break the loop
//! - The thread that builds the bridge is the only one allowed to install
//!   or listen; violations panic

use std::collections::VecDeque;
use std::os::raw::c_int;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM, SIGUSR1};
use signal_hook::iterator::Signals;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Internal-only signal used to break the wait loop.
pub const SIGNAL_EXIT: c_int = SIGUSR1;

/// Every signal the bridge registers for.
pub const HANDLED_SIGNALS: [c_int; 4] = [SIGTERM, SIGINT, SIGHUP, SIGNAL_EXIT];

/// What the bridge asks of the lifecycle controller.
///
/// Both calls must return immediately.
pub trait LifecycleRequests {
    fn reload(&self);
    fn shutdown(&self);
}

/// Where signal numbers come from.
pub trait SignalSource: Send + Sync {
    /// Start receiving the [`HANDLED_SIGNALS`].
    fn install(&self) -> Result<()>;

    /// Block until the next signal. `None` means the source is closed.
    fn wait(&self) -> Option<c_int>;

    /// Deliver [`SIGNAL_EXIT`] so that a pending `wait` returns.
    fn wake(&self) -> Result<()>;
}

#[derive(Default)]
struct OsState {
    signals: Option<Signals>,
    backlog: VecDeque<c_int>,
}

/// Real process signals, via signal-hook.
#[derive(Default)]
pub struct OsSignals {
    state: Mutex<OsState>,
}

impl OsSignals {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSource for OsSignals {
    fn install(&self) -> Result<()> {
        let signals = Signals::new(HANDLED_SIGNALS).map_err(Error::Signal)?;
        self.state.lock().unwrap_or_else(PoisonError::into_inner).signals = Some(signals);
        Ok(())
    }

    fn wait(&self) -> Option<c_int> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let OsState { signals, backlog } = &mut *guard;
        loop {
            if let Some(signal) = backlog.pop_front() {
                return Some(signal);
            }
            let registered = signals.as_mut()?;
            if registered.is_closed() {
                return None;
            }
            backlog.extend(registered.wait());
        }
    }

    fn wake(&self) -> Result<()> {
        kill(Pid::this(), Signal::SIGUSR1).map_err(|errno| Error::Signal(errno.into()))
    }
}

/// Signals raised from inside the process.
///
/// Clones share one channel: keep a clone to [`raise`](Self::raise) while the
/// bridge owns another. Useful in tests and for hosts that learn about
/// signals some other way.
#[derive(Clone)]
pub struct ManualSignals {
    tx: mpsc::UnboundedSender<c_int>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<c_int>>>,
}

impl ManualSignals {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Queue `signal` for the bridge.
    pub fn raise(&self, signal: c_int) {
        let _ = self.tx.send(signal);
    }
}

impl Default for ManualSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for ManualSignals {
    fn install(&self) -> Result<()> {
        Ok(())
    }

    fn wait(&self) -> Option<c_int> {
        self.rx.lock().unwrap_or_else(PoisonError::into_inner).blocking_recv()
    }

    fn wake(&self) -> Result<()> {
        self.raise(SIGNAL_EXIT);
        Ok(())
    }
}

/// Outcome of dispatching one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// One-shot "the wait loop has exited" event.
#[derive(Debug, Default)]
struct LoopExit {
    exited: Mutex<bool>,
    cond: Condvar,
}

impl LoopExit {
    fn complete(&self) {
        *self.exited.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut exited = self.exited.lock().unwrap_or_else(PoisonError::into_inner);
        while !*exited {
            exited = self.cond.wait(exited).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn is_complete(&self) -> bool {
        *self.exited.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Maps signals onto lifecycle requests and owns the wait loop.
pub struct SignalBridge {
    source: Box<dyn SignalSource>,
    owner: ThreadId,
    loop_exit: LoopExit,
}

impl SignalBridge {
    /// Build a bridge whose designated thread is the calling thread.
    pub fn new(source: impl SignalSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            owner: thread::current().id(),
            loop_exit: LoopExit::default(),
        }
    }

    /// Bridge over real process signals.
    pub fn os() -> Self {
        Self::new(OsSignals::new())
    }

    fn assert_owner(&self, operation: &str) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "SignalBridge::{operation} called off the signal-handling thread"
        );
    }

    /// Register for the handled signals.
    ///
    /// # Panics
    /// When called from any thread other than the one that built the bridge.
    pub fn install(&self) -> Result<()> {
        self.assert_owner("install");
        self.source.install()?;
        tracing::info!(signals = ?HANDLED_SIGNALS, "Signal handlers installed");
        Ok(())
    }

    /// Wait for signals and dispatch them until [`SIGNAL_EXIT`] arrives.
    ///
    /// # Panics
    /// When called from any thread other than the one that built the bridge.
    pub fn listen(&self, lifecycle: &dyn LifecycleRequests) {
        self.assert_owner("listen");
        tracing::debug!("Listening for signals");

        loop {
            match self.source.wait() {
                Some(signal) => {
                    if self.dispatch(signal, lifecycle) == Flow::Exit {
                        break;
                    }
                }
                None => {
                    tracing::warn!("Signal source closed, leaving wait loop");
                    break;
                }
            }
        }

        self.loop_exit.complete();
        tracing::debug!("Signal wait loop exited");
    }

    /// Handle one signal. Never blocks.
    pub fn dispatch(&self, signal: c_int, lifecycle: &dyn LifecycleRequests) -> Flow {
        match signal {
            SIGTERM | SIGINT => {
                tracing::info!(signal, "Termination signal received");
                lifecycle.shutdown();
                Flow::Continue
            }
            SIGHUP => {
                tracing::info!(signal, "Hangup received");
                lifecycle.reload();
                Flow::Continue
            }
            SIGNAL_EXIT => Flow::Exit,
            other => {
                tracing::debug!(signal = other, "Ignoring unexpected signal");
                Flow::Continue
            }
        }
    }

    /// Break the wait loop and block until it has exited.
    ///
    /// # Panics
    /// When called from the signal-handling thread itself, which would
    /// otherwise wait on its own loop forever.
    pub fn request_loop_exit(&self) -> Result<()> {
        assert_ne!(
            thread::current().id(),
            self.owner,
            "SignalBridge::request_loop_exit called from the signal-handling thread"
        );
        self.source.wake()?;
        self.loop_exit.wait();
        Ok(())
    }

    /// Whether `listen` has returned.
    pub fn loop_exited(&self) -> bool {
        self.loop_exit.is_complete()
    }
}
