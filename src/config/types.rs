//! Configuration type definitions.

use crate::constants::{DEFAULT_CONFIDENCE_THRESHOLD, local_model, remote};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default run settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Local model settings.
    #[serde(default)]
    pub local: LocalModelConfig,

    /// Remote backend settings.
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl Config {
    /// Copy of this configuration with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if shown.remote.api_key.is_some() {
            shown.remote.api_key = Some("********".to_string());
        }
        shown
    }
}

/// Default run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Minimum confidence for a detection to be retained.
    pub confidence_threshold: f32,

    /// Detection backend used for the whole run.
    pub backend: BackendKind,

    /// Keep photos without wildlife (their sidecars are always written).
    pub save_all: bool,

    /// Move retained originals instead of copying them.
    pub move_originals: bool,

    /// Destination directory layout.
    pub placement: Placement,

    /// Descend into subdirectories of the input directory.
    pub recursive: bool,

    /// Cap on species names embedded in a filename.
    pub max_species_in_name: Option<usize>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            backend: BackendKind::Local,
            save_all: false,
            move_originals: false,
            placement: Placement::Flat,
            recursive: false,
            max_species_in_name: None,
        }
    }
}

/// Local model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelConfig {
    /// Path to the ONNX model (default: platform models directory).
    pub model_path: Option<PathBuf>,

    /// URL to fetch the model from when it is missing.
    pub model_url: Option<String>,

    /// Expected SHA-256 of the model file (hex).
    pub model_sha256: Option<String>,

    /// Model identity recorded in sidecars.
    pub model_name: String,

    /// Square input size in pixels.
    pub input_size: u32,

    /// IoU threshold for non-maximum suppression.
    pub iou_threshold: f32,

    /// Candidates below this score are never reported.
    pub candidate_floor: f32,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_url: None,
            model_sha256: None,
            model_name: local_model::DEFAULT_MODEL_NAME.to_string(),
            input_size: local_model::DEFAULT_INPUT_SIZE,
            iou_threshold: local_model::DEFAULT_IOU_THRESHOLD,
            candidate_floor: local_model::DEFAULT_CANDIDATE_FLOOR,
        }
    }
}

/// Remote backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// HTTPS endpoint accepting image uploads.
    pub endpoint: Option<String>,

    /// Bearer credential.
    pub api_key: Option<String>,

    /// Model identity recorded in sidecars.
    pub model: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Total attempts per image, first try included.
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_backoff_ms: u64,

    /// Ceiling for the retry delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: remote::DEFAULT_MODEL_NAME.to_string(),
            timeout_secs: remote::DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: remote::DEFAULT_CONNECT_TIMEOUT_SECS,
            max_attempts: remote::DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: remote::DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: remote::DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Detection backend variants.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// General-purpose object detector run locally.
    #[default]
    Local,
    /// Hosted camera-trap specialist reached over HTTPS.
    Remote,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Destination directory layout.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// Everything directly in the output root.
    #[default]
    Flat,
    /// One subdirectory per capture day.
    ByDate,
    /// One subdirectory per leading species.
    BySpecies,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::ByDate => write!(f, "by-date"),
            Self::BySpecies => write!(f, "by-species"),
        }
    }
}
