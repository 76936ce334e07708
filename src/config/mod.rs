//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (clap)          config file (TOML, [steward] table)
//!     → Settings                   → loader.rs → Settings
//!              \                  /
//!               merged_over (command line wins)
//!                       → validation.rs (required settings, log levels)
//!                       → Options (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - The default config file is optional; an explicitly named one is not
//! - Every setting can come from either source
//! - Config is read once at startup; reload does not re-read it

pub mod loader;
pub mod schema;
pub mod validation;

use std::path::Path;

pub use schema::{LogOptions, Options, Settings};

use crate::error::Result;

/// Read the config file, overlay `overrides` from the command line and validate.
pub fn resolve(config_file: Option<&Path>, overrides: Settings) -> Result<Options> {
    let from_file = loader::load_settings(config_file)?;
    let options = validation::validate(overrides.merged_over(from_file))?;
    Ok(options)
}
