//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Install signals → Start subsystems (backends first) → Spawn worker → Listen
//!
//! Signals (signals.rs, primary thread):
//!     SIGTERM/SIGINT → controller.shutdown()
//!     SIGHUP         → controller.reload()
//!     SIGUSR1        → leave the wait loop (internal)
//!
//! Controller (controller.rs, worker thread):
//!     queue.rs (FIFO) → Shutdown: stop signal loop → stop subsystems in order → exit
//!                     → Reload: logged and ignored
//!
//! Watchdog (watchdog.rs):
//!     controller.panic() → alarm(60s) → process killed if still alive
//! ```
//!
//! # Design Decisions
//! - Signal dispatch only enqueues; all real work happens on the worker
//! - Ordered shutdown: listeners before backends, stop intake then processing
//! - Shutdown runs at most once; later events are inert
//! - Shutdown has a timeout only when requested through `panic()`

pub mod controller;
pub mod queue;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod subsystem;
pub mod watchdog;

pub use controller::{Controller, ControllerBuilder, LifecycleState};
pub use queue::{LifecycleEvent, LifecycleQueue};
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::{LifecycleRequests, ManualSignals, OsSignals, SignalBridge, SignalSource};
pub use startup::launch;
pub use subsystem::Subsystem;
pub use watchdog::{install_panic_hook, Alarm, ProcessAlarm, PANIC_TIMEOUT};
