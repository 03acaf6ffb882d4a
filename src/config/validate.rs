//! Configuration validation.

use crate::config::{BackendKind, Config};
use crate::constants::{confidence, local_model};
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_defaults(config)?;
    validate_local(config)?;
    validate_remote(config)?;
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

/// Validate default settings.
fn validate_defaults(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    if !(confidence::MIN..=confidence::MAX).contains(&defaults.confidence_threshold) {
        return Err(invalid(format!(
            "confidence_threshold must be between {} and {}, got {}",
            confidence::MIN,
            confidence::MAX,
            defaults.confidence_threshold
        )));
    }

    if defaults.max_species_in_name == Some(0) {
        return Err(invalid(
            "max_species_in_name must be at least 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validate local model settings.
fn validate_local(config: &Config) -> Result<()> {
    let local = &config.local;

    if local.input_size == 0 || local.input_size % local_model::STRIDE != 0 {
        return Err(invalid(format!(
            "input_size must be a positive multiple of {}, got {}",
            local_model::STRIDE,
            local.input_size
        )));
    }

    if !(local.iou_threshold > 0.0 && local.iou_threshold <= 1.0) {
        return Err(invalid(format!(
            "iou_threshold must be in (0, 1], got {}",
            local.iou_threshold
        )));
    }

    if !(0.0..=1.0).contains(&local.candidate_floor) {
        return Err(invalid(format!(
            "candidate_floor must be between 0 and 1, got {}",
            local.candidate_floor
        )));
    }

    if let Some(digest) = &local.model_sha256
        && (digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(invalid(format!(
            "model_sha256 must be 64 hex characters, got '{digest}'"
        )));
    }

    Ok(())
}

/// Validate remote backend settings.
///
/// Endpoint and credential are only required when the remote backend is selected.
fn validate_remote(config: &Config) -> Result<()> {
    let remote = &config.remote;

    if remote.max_attempts == 0 {
        return Err(invalid("max_attempts must be at least 1".to_string()));
    }

    if remote.timeout_secs == 0 {
        return Err(invalid("timeout_secs must be at least 1".to_string()));
    }

    if remote.initial_backoff_ms > remote.max_backoff_ms {
        return Err(invalid(format!(
            "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
            remote.initial_backoff_ms, remote.max_backoff_ms
        )));
    }

    if config.defaults.backend == BackendKind::Remote {
        match remote.endpoint.as_deref() {
            None | Some("") => {
                return Err(invalid(
                    "remote backend selected but no endpoint configured".to_string(),
                ));
            }
            Some(url) if !url.starts_with("https://") && !url.starts_with("http://") => {
                return Err(invalid(format!("endpoint must be an http(s) URL, got '{url}'")));
            }
            Some(_) => {}
        }

        if remote.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(invalid(
                "remote backend selected but no credential configured".to_string(),
            ));
        }
    }

    Ok(())
}
