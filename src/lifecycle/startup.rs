//! Startup orchestration.
//!
//! # Responsibilities
//! - Install signal handlers before anything can be interrupted by them
//! - Start subsystems in dependency order
//! - Start the lifecycle worker
//! - Park the calling thread in the signal wait loop
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems start in reverse shutdown order (listeners start last,
//!   traffic only when the backends are ready)
//! - A failed start stops whatever already started

use std::sync::Arc;

use crate::error::Result;
use crate::lifecycle::controller::Controller;

/// Run the service on the calling thread, which must be the thread that
/// built the controller's signal bridge.
///
/// Returns an error if startup fails. Once running, it returns only if the
/// controller's terminate hook returns.
pub fn launch(controller: &Arc<Controller>) -> Result<()> {
    controller.bridge().install()?;

    start_subsystems(controller)?;

    let worker = controller.spawn_worker()?;
    controller.bridge().listen(controller.as_ref());

    if worker.join().is_err() {
        tracing::error!("Lifecycle worker panicked");
    }
    Ok(())
}

fn start_subsystems(controller: &Controller) -> Result<()> {
    let subsystems = controller.subsystems();

    for (index, subsystem) in subsystems.iter().enumerate().rev() {
        tracing::info!(subsystem = subsystem.name(), "Starting subsystem");
        if let Err(e) = subsystem.start() {
            tracing::error!(subsystem = subsystem.name(), error = %e, "Subsystem failed to start");
            for running in &subsystems[index + 1..] {
                running.shutdown();
            }
            return Err(e);
        }
    }

    Ok(())
}
