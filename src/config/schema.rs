//! Configuration schema definitions.
//!
//! `Settings` is the raw, all-optional shape shared by the command line and
//! the configuration file. `Options` is what remains after validation and is
//! what the rest of the service consumes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Default request timeout for the HTTP intake.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw settings, as given on the command line or in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Unix socket the HTTP intake serves on.
    pub socket_file: Option<PathBuf>,

    /// Minimum level printed on stderr (NONE, DEBUG, INFO, WARN, ERROR, CRITICAL).
    pub log_stderr_level: Option<String>,

    /// File that log lines are appended to.
    pub log_file: Option<PathBuf>,

    /// Minimum level written to `log_file`.
    pub log_file_level: Option<String>,

    /// Request timeout for the HTTP intake, in seconds.
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    /// Overlay `self` on top of `base`: every field set here wins.
    pub fn merged_over(self, base: Settings) -> Settings {
        Settings {
            socket_file: self.socket_file.or(base.socket_file),
            log_stderr_level: self.log_stderr_level.or(base.log_stderr_level),
            log_file: self.log_file.or(base.log_file),
            log_file_level: self.log_file_level.or(base.log_file_level),
            request_timeout_secs: self.request_timeout_secs.or(base.request_timeout_secs),
        }
    }
}

/// On-disk layout: settings live in the `[steward]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub steward: Settings,
}

/// Where log output goes and how much of it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogOptions {
    /// Level for stderr output; `None` disables it.
    pub stderr: Option<LevelFilter>,

    /// Log file and its level; `None` disables file output.
    pub file: Option<(PathBuf, LevelFilter)>,
}

/// Validated options the service runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub socket_file: PathBuf,
    pub logging: LogOptions,
    pub request_timeout: Duration,
}
