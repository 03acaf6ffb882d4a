//! Platform-specific configuration and data paths.

use crate::constants::{APP_NAME, local_model};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME).ok_or(Error::ConfigDirNotFound)
}

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/trailcam/`
/// - macOS: `~/Library/Application Support/trailcam/`
/// - Windows: `%APPDATA%\trailcam\`
pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

/// Get the full path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Directory holding downloaded model weights.
pub fn models_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("models"))
}

/// Default location of the local model weights.
pub fn default_model_path() -> Result<PathBuf> {
    Ok(models_dir()?.join(local_model::DEFAULT_MODEL_FILE))
}
