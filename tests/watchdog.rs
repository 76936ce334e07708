//! Watchdog tests against real SIGALRM.
//!
//! Each test re-runs this test binary as a child process restricted to
//! itself; the child hangs its shutdown and must be killed by the alarm.

use std::env;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Output};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::SIGALRM;
use steward::error::Result;
use steward::lifecycle::{
    install_panic_hook, launch, Alarm, Controller, ProcessAlarm, SignalBridge, Subsystem,
};

/// Set in the child to the name of the test it should act out.
const CHILD_ENV: &str = "STEWARD_WATCHDOG_CHILD";

const HUNG_MARKER: &str = "hung subsystem stopping";

/// Subsystem whose shutdown never returns.
struct Hung;

impl Subsystem for Hung {
    fn name(&self) -> &str {
        "hung"
    }

    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) {
        eprintln!("{HUNG_MARKER}");
        loop {
            thread::park();
        }
    }
}

/// Real process alarm that fires after one second whatever it is asked for.
struct OneSecondAlarm;

impl Alarm for OneSecondAlarm {
    fn arm(&self, after: Duration) {
        eprintln!("alarm requested after {after:?}");
        ProcessAlarm.arm(Duration::from_secs(1));
    }
}

fn is_child(test: &str) -> bool {
    env::var(CHILD_ENV).as_deref() == Ok(test)
}

fn run_child(test: &str) -> (Output, Duration) {
    let started = Instant::now();
    let output = Command::new(env::current_exe().unwrap())
        .args([test, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, test)
        .output()
        .unwrap();
    (output, started.elapsed())
}

fn launch_and_hang(controller: &Arc<Controller>) -> ! {
    let outcome = launch(controller);
    eprintln!("launch returned: {outcome:?}");
    std::process::exit(3);
}

#[test]
fn hanging_shutdown_is_killed_by_the_alarm() {
    const TEST: &str = "hanging_shutdown_is_killed_by_the_alarm";
    if is_child(TEST) {
        let controller = Controller::builder(Arc::new(SignalBridge::os()))
            .subsystem(Arc::new(Hung))
            .build();
        ProcessAlarm.arm(Duration::from_secs(1));
        controller.shutdown();
        launch_and_hang(&controller);
    }

    let (output, elapsed) = run_child(TEST);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.signal(), Some(SIGALRM), "{stderr}");
    assert!(stderr.contains(HUNG_MARKER), "{stderr}");
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");
}

#[test]
fn panic_on_any_thread_ends_the_process() {
    const TEST: &str = "panic_on_any_thread_ends_the_process";
    if is_child(TEST) {
        let controller = Controller::builder(Arc::new(SignalBridge::os()))
            .subsystem(Arc::new(Hung))
            .alarm(OneSecondAlarm)
            .build();
        install_panic_hook(Arc::clone(&controller));

        let _ = thread::spawn(|| panic!("worker blew up")).join();
        launch_and_hang(&controller);
    }

    let (output, elapsed) = run_child(TEST);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.signal(), Some(SIGALRM), "{stderr}");
    assert!(stderr.contains("worker blew up"), "{stderr}");
    assert!(stderr.contains("alarm requested after 60s"), "{stderr}");
    assert!(stderr.contains(HUNG_MARKER), "{stderr}");
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");
}
