//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! socket_file (Unix domain socket)
//!     → listener.rs (bind, stale-socket cleanup)
//!     → Hand off to HTTP layer
//!     → listener.rs (unlink on shutdown)
//! ```

pub mod listener;
