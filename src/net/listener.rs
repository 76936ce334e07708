//! Unix domain socket listener.
//!
//! # Responsibilities
//! - Bind to the configured socket path
//! - Clear a stale socket left by a previous run
//! - Remove the socket file again on shutdown
//!
//! # Design Decisions
//! - Only socket files are ever removed; any other file at the path is an error
//! - Binding registers with the tokio reactor, so it needs a runtime context

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use tokio::net::UnixListener;

use crate::error::{Error, Result};

/// Bind a listener at `path`, replacing a stale socket file.
///
/// Must be called from within a tokio runtime context.
pub fn bind(path: &Path) -> Result<UnixListener> {
    let bind_error = |source: io::Error| Error::Bind {
        path: path.to_path_buf(),
        source,
    };

    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            tracing::debug!(path = %path.display(), "Removing stale socket");
            fs::remove_file(path).map_err(bind_error)?;
        }
        Ok(_) => {
            return Err(bind_error(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "path exists and is not a socket",
            )));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(bind_error(e)),
    }

    let listener = UnixListener::bind(path).map_err(bind_error)?;
    tracing::info!(path = %path.display(), "Listener bound");
    Ok(listener)
}

/// Remove the socket file at `path`, if it is still there.
pub fn unlink(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Socket removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove socket"),
    }
}
