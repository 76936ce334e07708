//! Crate-level error type.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::config::validation::ValidationError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while starting or running the service.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Settings were read but are not usable.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Log file could not be opened.
    #[error("error opening log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Global subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// Signal dispositions could not be registered or raised.
    #[error("signal handling failed: {0}")]
    Signal(#[source] std::io::Error),

    /// Listener socket could not be bound.
    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A managed subsystem refused to start.
    #[error("subsystem {name} failed to start: {reason}")]
    SubsystemStart { name: String, reason: String },

    /// The receiving side of an internal channel is gone.
    #[error("{component} channel closed")]
    ChannelClosed { component: &'static str },

    /// The lifecycle queue already has its consumer.
    #[error("lifecycle worker already spawned")]
    WorkerAlreadySpawned,

    /// Any other I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for a failure that aborts startup.
    ///
    /// Option and configuration problems use 2, like a usage error;
    /// everything else is a plain failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) | Error::Validation(_) => 2,
            _ => 1,
        }
    }
}
