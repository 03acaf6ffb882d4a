//! Local model weight management.

mod download;

pub use download::{download_file, fetch_model};

use crate::config::{LocalModelConfig, default_model_path};
use crate::error::Result;
use std::path::PathBuf;
use tracing::info;

/// Configured model path, or the platform default.
pub fn resolve_model_path(config: &LocalModelConfig) -> Result<PathBuf> {
    config
        .model_path
        .clone()
        .map_or_else(default_model_path, Ok)
}

/// Resolve the model path, fetching the weights first when they are missing
/// and a download URL is configured.
pub fn ensure_model(config: &LocalModelConfig, show_progress: bool) -> Result<PathBuf> {
    let path = resolve_model_path(config)?;
    if !path.is_file() && config.model_url.is_some() {
        info!("Model not found at {}, fetching", path.display());
        fetch_model(config, &path, false, show_progress)?;
    }
    Ok(path)
}
