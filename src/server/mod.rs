//! Backend message server.
//!
//! # Data Flow
//! ```text
//! MessageSender::submit (any thread, e.g. HTTP handlers)
//!     → unbounded channel
//!     → pump task (tokio runtime)
//!     → every Sink, in registration order
//! ```
//!
//! # Design Decisions
//! - Sinks are synchronous and cheap; they run on the pump task
//! - Shutdown delivers whatever is already queued, then stops
//! - Nothing is persisted

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lifecycle::{Shutdown, ShutdownListener, Subsystem};

/// A message accepted by the intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub body: String,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: body.into(),
        }
    }
}

/// Destination for delivered messages.
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;
    fn deliver(&self, message: &Message);
}

/// Sink that writes one log line per message.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Sink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, message: &Message) {
        tracing::info!(message_id = %message.id, bytes = message.body.len(), "Message received");
    }
}

/// Cloneable handle for submitting messages.
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl MessageSender {
    /// Queue `message` for delivery. Fails once the server has stopped.
    pub fn submit(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::ChannelClosed {
            component: "message server",
        })
    }
}

/// Hands submitted messages to sinks on a background task.
pub struct MessageServer {
    runtime: Handle,
    sinks: Arc<Vec<Arc<dyn Sink>>>,
    tx: mpsc::UnboundedSender<Message>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
    stop_signal: Shutdown,
    pump: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    delivered: Arc<AtomicU64>,
}

impl MessageServer {
    pub fn new(runtime: Handle, sinks: Vec<Arc<dyn Sink>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            sinks: Arc::new(sinks),
            tx,
            rx: Mutex::new(Some(rx)),
            stop_signal: Shutdown::new(),
            pump: Mutex::new(None),
            stopped: AtomicBool::new(false),
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn sender(&self) -> MessageSender {
        MessageSender { tx: self.tx.clone() }
    }

    /// Messages handed to the sinks so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl Subsystem for MessageServer {
    fn name(&self) -> &str {
        "message-server"
    }

    fn start(&self) -> Result<()> {
        let reason = if self.stopped.load(Ordering::SeqCst) {
            "already stopped"
        } else {
            "already started"
        };
        let rx = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::SubsystemStart {
                name: self.name().to_string(),
                reason: reason.to_string(),
            })?;

        let task = self.runtime.spawn(pump(
            rx,
            Arc::clone(&self.sinks),
            self.stop_signal.subscribe(),
            Arc::clone(&self.delivered),
        ));
        *self.pump.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        tracing::info!(
            sinks = ?self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "Message server started"
        );
        Ok(())
    }

    fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_signal.trigger();

        // Never started: nothing will drain the channel, so refuse new messages.
        if let Some(mut rx) = self.rx.lock().unwrap_or_else(PoisonError::into_inner).take() {
            rx.close();
        }

        let task = self.pump.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = self.runtime.block_on(task) {
                tracing::error!(error = %e, "Message pump ended abnormally");
            }
        }
        tracing::info!(delivered = self.delivered(), "Message server stopped");
    }
}

async fn pump(
    mut rx: mpsc::UnboundedReceiver<Message>,
    sinks: Arc<Vec<Arc<dyn Sink>>>,
    mut shutdown: ShutdownListener,
    delivered: Arc<AtomicU64>,
) {
    let deliver = |message: Message| {
        for sink in sinks.iter() {
            sink.deliver(&message);
        }
        delivered.fetch_add(1, Ordering::SeqCst);
    };

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => deliver(message),
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }

    // Drain what was accepted before the stop, refuse the rest.
    rx.close();
    while let Ok(message) = rx.try_recv() {
        deliver(message);
    }
}
