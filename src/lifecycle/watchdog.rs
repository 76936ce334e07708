//! Watchdog alarm for shutdowns that hang.
//!
//! Arming schedules SIGALRM for the whole process. Nothing handles SIGALRM,
//! so when it fires the kernel kills the process. Arming again replaces the
//! previous deadline.

use std::panic;
use std::sync::Arc;
use std::time::Duration;

use nix::unistd::alarm;

use crate::lifecycle::controller::Controller;

/// Deadline armed by `Controller::panic`.
pub const PANIC_TIMEOUT: Duration = Duration::from_secs(60);

/// A deferred forced termination.
pub trait Alarm: Send + Sync {
    /// Terminate the process once `after` has elapsed. Must not block.
    fn arm(&self, after: Duration);
}

/// `alarm(2)` on the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessAlarm;

impl Alarm for ProcessAlarm {
    fn arm(&self, after: Duration) {
        let secs = after.as_secs().clamp(1, u64::from(u32::MAX)) as u32;
        let previous = alarm::set(secs);
        tracing::warn!(secs, previous_remaining = ?previous, "Watchdog alarm armed");
    }
}

/// Route every panic, on any thread, into [`Controller::panic`].
///
/// The previously installed hook still runs first, so the panic message
/// is printed as usual.
pub fn install_panic_hook(controller: Arc<Controller>) {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "Panic, shutting down");
        default_hook(info);
        controller.panic();
    }));
}
