//! Settings management
//!
//! The lifecycle config lives in an optional JSON file. Without one every
//! field takes its default.

use reaper_core::LifecycleConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the config file when no path is passed.
pub const CONFIG_ENV: &str = "REAPER_CONFIG";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads from `path`, else from `$REAPER_CONFIG`, else defaults.
pub fn load_settings(path: Option<&Path>) -> Result<LifecycleConfig, SettingsError> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    match path.map(Path::to_path_buf).or(from_env) {
        Some(path) => load_file(&path),
        None => {
            tracing::debug!("no config file given; using defaults");
            Ok(LifecycleConfig::default())
        }
    }
}

pub fn load_file(path: &Path) -> Result<LifecycleConfig, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = from_json_str(&content)?;
    tracing::info!(path = %path.display(), preset = %config.default_preset, "loaded config");
    Ok(config)
}

pub fn from_json_str(json: &str) -> Result<LifecycleConfig, SettingsError> {
    Ok(serde_json::from_str(json)?)
}
