//! HTTP intake server.
//!
//! # Responsibilities
//! - Create the Axum router (`POST /messages`, `GET /health`)
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve on the Unix socket as a managed subsystem
//! - Hand accepted messages to the message server
//!
//! # Design Decisions
//! - No routing beyond the two fixed endpoints
//! - Shutdown is graceful: in-flight requests finish, then the socket goes away

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::http::request;
use crate::lifecycle::{Shutdown, Subsystem};
use crate::net::listener;
use crate::server::{Message, MessageSender};

/// Largest accepted message body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
struct IntakeState {
    messages: MessageSender,
}

/// Response body for an accepted message.
#[derive(Debug, Serialize)]
pub struct Receipt {
    pub id: Uuid,
}

/// Build the intake router with all middleware layers.
#[allow(deprecated)]
pub fn router(messages: MessageSender, request_timeout: Duration) -> Router {
    Router::new()
        .route("/messages", post(submit))
        .route("/health", get(health))
        .with_state(IntakeState { messages })
        .layer(
            ServiceBuilder::new()
                .layer(request::set_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(request::propagate_request_id())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

async fn submit(State(state): State<IntakeState>, headers: HeaderMap, body: String) -> Response {
    let request_id = request::request_id(&headers);

    if body.trim().is_empty() {
        tracing::warn!(request_id = %request_id, "Rejected empty message");
        return (StatusCode::BAD_REQUEST, "empty message").into_response();
    }

    let message = Message::new(body);
    let id = message.id;
    match state.messages.submit(message) {
        Ok(()) => {
            tracing::debug!(request_id = %request_id, message_id = %id, "Message accepted");
            (StatusCode::ACCEPTED, Json(Receipt { id })).into_response()
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Message server unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Listener-facing subsystem: the HTTP intake on a Unix socket.
pub struct HttpIntake {
    socket_path: PathBuf,
    request_timeout: Duration,
    runtime: Handle,
    messages: MessageSender,
    stop_signal: Shutdown,
    server: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
    stopped: AtomicBool,
}

impl HttpIntake {
    pub fn new(
        runtime: Handle,
        socket_path: impl Into<PathBuf>,
        request_timeout: Duration,
        messages: MessageSender,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            request_timeout,
            runtime,
            messages,
            stop_signal: Shutdown::new(),
            server: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Subsystem for HttpIntake {
    fn name(&self) -> &str {
        "http-intake"
    }

    fn start(&self) -> Result<()> {
        let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        let refusal = if self.stopped.load(Ordering::SeqCst) {
            Some("already stopped")
        } else if server.is_some() {
            Some("already started")
        } else {
            None
        };
        if let Some(reason) = refusal {
            return Err(Error::SubsystemStart {
                name: self.name().to_string(),
                reason: reason.to_string(),
            });
        }

        let listener = {
            let _runtime = self.runtime.enter();
            listener::bind(&self.socket_path)?
        };
        let app = router(self.messages.clone(), self.request_timeout);
        let mut stop = self.stop_signal.subscribe();

        tracing::info!(
            path = %self.socket_path.display(),
            request_timeout_secs = self.request_timeout.as_secs(),
            "HTTP intake starting"
        );
        *server = Some(self.runtime.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.recv().await })
                .await
        }));
        Ok(())
    }

    fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_signal.trigger();

        let task = self.server.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(task) = task else {
            return;
        };
        match self.runtime.block_on(task) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP intake failed"),
            Err(e) => tracing::error!(error = %e, "HTTP intake task ended abnormally"),
        }
        listener::unlink(&self.socket_path);
        tracing::info!("HTTP intake stopped");
    }
}
