//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use steward::error::{Error, Result};
use steward::lifecycle::{launch, Alarm, Controller, ManualSignals, SignalBridge, Subsystem};

/// Ordered record of subsystem starts and stops, shared by a test's subsystems.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Subsystem that only writes `start:<name>` / `stop:<name>` to a journal.
pub struct Recorder {
    name: String,
    journal: Journal,
    fail_start: bool,
}

impl Recorder {
    pub fn new(name: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            fail_start: false,
        })
    }

    pub fn failing(name: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            fail_start: true,
        })
    }
}

impl Subsystem for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<()> {
        self.journal.lock().unwrap().push(format!("start:{}", self.name));
        if self.fail_start {
            return Err(Error::SubsystemStart {
                name: self.name.clone(),
                reason: "refused".to_string(),
            });
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.journal.lock().unwrap().push(format!("stop:{}", self.name));
    }
}

/// Alarm that remembers every arming instead of scheduling SIGALRM.
#[derive(Clone, Default)]
pub struct RecordingAlarm(Arc<Mutex<Vec<Duration>>>);

impl RecordingAlarm {
    pub fn armed(&self) -> Vec<Duration> {
        self.0.lock().unwrap().clone()
    }
}

impl Alarm for RecordingAlarm {
    fn arm(&self, after: Duration) {
        self.0.lock().unwrap().push(after);
    }
}

/// A controller launched on its own signal-handling thread.
pub struct Running {
    pub signals: ManualSignals,
    pub controller: Arc<Controller>,
    pub alarm: RecordingAlarm,
    exits: Arc<Mutex<Vec<i32>>>,
    thread: JoinHandle<Result<()>>,
}

impl Running {
    /// Build the bridge and controller on a fresh thread and launch there.
    ///
    /// Subsystems are listed in shutdown order.
    pub fn spawn(subsystems: Vec<Arc<dyn Subsystem>>) -> Self {
        let signals = ManualSignals::new();
        let source = signals.clone();
        let alarm = RecordingAlarm::default();
        let alarm_for_controller = alarm.clone();
        let exits = Arc::new(Mutex::new(Vec::new()));
        let exits_for_controller = Arc::clone(&exits);
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || {
                let bridge = Arc::new(SignalBridge::new(source));
                let mut builder = Controller::builder(bridge)
                    .alarm(alarm_for_controller)
                    .on_terminate(move |code| exits_for_controller.lock().unwrap().push(code));
                for subsystem in subsystems {
                    builder = builder.subsystem(subsystem);
                }
                let controller = builder.build();
                ready_tx.send(Arc::clone(&controller)).unwrap();
                launch(&controller)
            })
            .unwrap();

        let controller = ready_rx.recv().unwrap();
        Self {
            signals,
            controller,
            alarm,
            exits,
            thread,
        }
    }

    /// Exit codes passed to the terminate hook so far.
    pub fn exits(&self) -> Vec<i32> {
        self.exits.lock().unwrap().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for `launch` to return. Panics after `timeout`.
    pub fn finish(self, timeout: Duration) -> (Result<()>, Vec<i32>) {
        assert!(
            wait_until(timeout, || self.thread.is_finished()),
            "launch did not return within {timeout:?}"
        );
        let result = self.thread.join().unwrap();
        let exits = self.exits.lock().unwrap().clone();
        (result, exits)
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Send one HTTP/1.1 request over a Unix socket and return the raw response.
pub fn http_request(socket: &Path, method: &str, path: &str, body: &str) -> String {
    let mut stream = UnixStream::connect(socket).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

/// Status code of a raw HTTP response.
pub fn status_of(response: &str) -> u16 {
    response
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0)
}
