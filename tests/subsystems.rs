//! HTTP intake and message server over a real Unix socket.

mod common;

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{http_request, status_of, Running};
use signal_hook::consts::SIGTERM;
use steward::error::Error;
use steward::http::HttpIntake;
use steward::lifecycle::Subsystem;
use steward::server::{Message, MessageServer, Sink};
use tokio::runtime::Runtime;

#[derive(Default)]
struct Collect(Mutex<Vec<String>>);

impl Sink for Collect {
    fn name(&self) -> &str {
        "collect"
    }

    fn deliver(&self, message: &Message) {
        self.0.lock().unwrap().push(message.body.clone());
    }
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn posted_messages_reach_the_sinks() {
    let runtime = runtime();
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("steward.sock");

    let sink = Arc::new(Collect::default());
    let server = MessageServer::new(runtime.handle().clone(), vec![sink.clone() as Arc<dyn Sink>]);
    let intake = HttpIntake::new(
        runtime.handle().clone(),
        &socket,
        Duration::from_secs(5),
        server.sender(),
    );

    server.start().unwrap();
    intake.start().unwrap();

    let accepted = http_request(&socket, "POST", "/messages", "hello");
    assert_eq!(status_of(&accepted), 202);
    assert!(accepted.contains("\"id\":\""));
    assert!(accepted.to_ascii_lowercase().contains("x-request-id:"));

    let empty = http_request(&socket, "POST", "/messages", "");
    assert_eq!(status_of(&empty), 400);

    let health = http_request(&socket, "GET", "/health", "");
    assert_eq!(status_of(&health), 200);
    assert!(health.ends_with("ok"));

    intake.shutdown();
    assert!(!socket.exists());
    server.shutdown();

    assert_eq!(*sink.0.lock().unwrap(), vec!["hello"]);
    assert_eq!(server.delivered(), 1);
}

#[test]
fn intake_refuses_a_path_that_is_not_a_socket() {
    let runtime = runtime();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steward.sock");
    fs::write(&path, b"occupied").unwrap();

    let server = MessageServer::new(runtime.handle().clone(), Vec::new());
    let intake = HttpIntake::new(runtime.handle().clone(), &path, Duration::from_secs(5), server.sender());

    assert!(matches!(intake.start(), Err(Error::Bind { .. })));
    assert!(path.exists());
}

#[test]
fn intake_shutdown_is_idempotent() {
    let runtime = runtime();
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("steward.sock");

    let server = MessageServer::new(runtime.handle().clone(), Vec::new());
    let intake = HttpIntake::new(runtime.handle().clone(), &socket, Duration::from_secs(5), server.sender());

    intake.start().unwrap();
    assert!(socket.exists());

    intake.shutdown();
    intake.shutdown();
    assert!(!socket.exists());
    assert!(matches!(
        intake.start(),
        Err(Error::SubsystemStart { reason, .. }) if reason == "already stopped"
    ));
    assert!(!socket.exists());
}

#[test]
fn sigterm_drains_intake_then_server() {
    let runtime = runtime();
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("steward.sock");

    let sink = Arc::new(Collect::default());
    let server = Arc::new(MessageServer::new(
        runtime.handle().clone(),
        vec![sink.clone() as Arc<dyn Sink>],
    ));
    let intake = Arc::new(HttpIntake::new(
        runtime.handle().clone(),
        &socket,
        Duration::from_secs(5),
        server.sender(),
    ));

    let running = Running::spawn(vec![
        Arc::clone(&intake) as Arc<dyn Subsystem>,
        Arc::clone(&server) as Arc<dyn Subsystem>,
    ]);
    assert!(common::wait_until(Duration::from_secs(5), || socket.exists()));

    for body in ["one", "two", "three"] {
        assert_eq!(status_of(&http_request(&socket, "POST", "/messages", body)), 202);
    }

    running.signals.raise(SIGTERM);
    let (result, exits) = running.finish(Duration::from_secs(10));

    result.unwrap();
    assert_eq!(exits, vec![0]);
    assert!(!socket.exists());
    assert_eq!(*sink.0.lock().unwrap(), vec!["one", "two", "three"]);
}
