//! Steward: process lifecycle control for a long-running service.
//!
//! OS signals are turned into lifecycle requests on a designated thread,
//! queued, and handled one at a time by a worker that stops the service's
//! subsystems in a fixed order before exiting.

// Core
pub mod error;
pub mod lifecycle;

// Subsystems
pub mod http;
pub mod net;
pub mod server;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use config::Options;
pub use error::{Error, Result};
pub use lifecycle::{launch, Controller, Shutdown, SignalBridge, Subsystem};
