//! Configuration validation.
//!
//! # Responsibilities
//! - Check that required settings are present
//! - Parse log level names into filters
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Validation is a pure function: Settings → Result<Options, ValidationError>
//! - The first problem found is reported, naming the offending setting

use std::time::Duration;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::{LogOptions, Options, Settings, DEFAULT_REQUEST_TIMEOUT_SECS};

/// A setting that is missing or out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("\"{0}\" was not specified")]
    MissingSetting(&'static str),

    #[error("invalid value for \"{setting}\": {value}")]
    InvalidLogLevel { setting: &'static str, value: String },

    #[error("invalid value for \"request_timeout_secs\": {0}")]
    InvalidTimeout(u64),
}

/// Parse a log level name.
///
/// Returns `Ok(None)` for the names that mean "no output at all".
pub fn parse_log_level(value: &str) -> Option<Option<LevelFilter>> {
    match value.trim().to_ascii_uppercase().as_str() {
        "NONE" | "SILENT" | "QUIET" => Some(None),
        "CRITICAL" | "ERROR" => Some(Some(LevelFilter::ERROR)),
        "WARN" => Some(Some(LevelFilter::WARN)),
        "INFO" => Some(Some(LevelFilter::INFO)),
        "DEBUG" => Some(Some(LevelFilter::DEBUG)),
        _ => None,
    }
}

fn level_setting(setting: &'static str, value: Option<&str>) -> Result<Option<LevelFilter>, ValidationError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_log_level(raw).ok_or_else(|| ValidationError::InvalidLogLevel {
            setting,
            value: raw.to_string(),
        }),
    }
}

/// Validate merged settings and turn them into runnable [`Options`].
pub fn validate(settings: Settings) -> Result<Options, ValidationError> {
    let socket_file = settings
        .socket_file
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or(ValidationError::MissingSetting("socket_file"))?;

    let wants_file_log = settings.log_file.is_some() || settings.log_file_level.is_some();
    let log_file = settings.log_file.filter(|path| !path.as_os_str().is_empty());
    let log_file_level = settings.log_file_level.filter(|level| !level.is_empty());
    if wants_file_log {
        if log_file.is_none() {
            return Err(ValidationError::MissingSetting("log_file"));
        }
        if log_file_level.is_none() {
            return Err(ValidationError::MissingSetting("log_file_level"));
        }
    }

    let stderr = level_setting("log_stderr_level", settings.log_stderr_level.as_deref())?;
    let file_level = level_setting("log_file_level", log_file_level.as_deref())?;
    let file = match (log_file, file_level) {
        (Some(path), Some(level)) => Some((path, level)),
        _ => None,
    };

    let timeout_secs = settings.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout(timeout_secs));
    }

    Ok(Options {
        socket_file,
        logging: LogOptions { stderr, file },
        request_timeout: Duration::from_secs(timeout_secs),
    })
}
