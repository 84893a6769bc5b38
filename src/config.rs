// src/config.rs

//! Configuration loading utilities.
//!
//! The binary builds one [`Config`] at start-up through these helpers and
//! hands it to every component; nothing else reads configuration.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load configuration from a TOML file.
///
/// A missing file falls back to defaults; a malformed file is an error.
/// The result is validated either way.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)?
    } else {
        log::warn!("Config file {path:?} not found, using default configuration");
        Config::default()
    };

    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid config {path:?}: {e}")))?;
    Ok(config)
}

/// Resolve the store directory, preferring an explicit override.
pub fn storage_dir(config: &Config, override_dir: Option<&Path>) -> PathBuf {
    override_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.storage.dir))
}
