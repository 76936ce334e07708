//! The contract managed subsystems implement.

use crate::error::Result;

/// A unit of the service the lifecycle controller starts and stops.
pub trait Subsystem: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Begin accepting work. Returns promptly; may spawn its own threads or tasks.
    fn start(&self) -> Result<()>;

    /// Stop and release everything, blocking until done.
    ///
    /// Calling it again, or on a subsystem that never started, is a no-op.
    fn shutdown(&self);
}
