//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{ConfigFile, Settings};

/// Location searched when no config file is given explicitly.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/steward/steward.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error opening {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Load settings from `explicit`, or from [`DEFAULT_CONFIG_PATH`] when `None`.
///
/// Failing to open the default file is not an error and yields empty
/// settings. Failing to open an explicitly named file is. A file that opens
/// but does not parse is always an error.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(source) if explicit.is_some() => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No default config file, using command line only");
            return Ok(Settings::default());
        }
    };

    let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(file.steward)
}
