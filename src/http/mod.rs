//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Unix socket connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID set, propagated, logged)
//!     → POST /messages → message server
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{HttpIntake, Receipt};
