//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Route events to stderr and/or a log file, each with its own level
//!
//! # Design Decisions
//! - Uses tracing-subscriber's registry with one fmt layer per sink
//! - Thread names appear on every line (`lifecycle`, `steward-io`, `main`)
//! - No sink configured means no output at all

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::config::LogOptions;
use crate::error::{Error, Result};

/// Install the global subscriber described by `options`.
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init(options: &LogOptions) -> Result<()> {
    let stderr_layer = options.stderr.map(|level| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_thread_names(true)
            .with_filter(level)
    });

    let file_layer = match &options.file {
        Some((path, level)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| Error::LogFile {
                    path: path.clone(),
                    source,
                })?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_thread_names(true)
                    .with_filter(*level),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing::debug!(
        stderr = ?options.stderr,
        file = ?options.file.as_ref().map(|(path, _)| path),
        "Logging initialised"
    );
    Ok(())
}
