//! CLI argument definitions.

use super::validators::parse_confidence;
use crate::config::{BackendKind, Placement};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Sort trail-camera photos by wildlife detections.
#[derive(Debug, Parser)]
#[command(name = "trailcam")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory of photos to process.
    pub input_dir: Option<PathBuf>,

    /// Options for a batch run.
    #[command(flatten)]
    pub run: RunArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run detection on one image and print the results.
    Detect {
        /// Image to analyze.
        image: PathBuf,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the local model.
    Model {
        /// Model action to perform.
        #[command(subcommand)]
        action: ModelAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Model subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ModelAction {
    /// Download the local model weights from `local.model_url`.
    Fetch {
        /// Download even if the file already exists.
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for a batch run. Most also apply to `detect`.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Output directory for renamed photos and sidecars.
    #[arg(short, long, env = "TRAILCAM_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = "TRAILCAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Minimum confidence threshold (0.0-1.0).
    #[arg(short = 'c', long, global = true, value_parser = parse_confidence, env = "TRAILCAM_CONFIDENCE")]
    pub confidence: Option<f32>,

    /// Detection backend.
    #[arg(short, long, global = true, value_enum, env = "TRAILCAM_BACKEND")]
    pub backend: Option<BackendKind>,

    /// Keep photos without wildlife (sidecars are always written).
    #[arg(long)]
    pub save_all: bool,

    /// Move retained photos into the output tree instead of copying them.
    #[arg(long = "move")]
    pub move_originals: bool,

    /// Destination directory layout.
    #[arg(long, value_enum, env = "TRAILCAM_PLACEMENT")]
    pub placement: Option<Placement>,

    /// Descend into subdirectories of the input directory.
    #[arg(short, long)]
    pub recursive: bool,

    /// Path to ONNX model file (overrides config).
    #[arg(long, global = true, env = "TRAILCAM_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Remote backend endpoint (overrides config).
    #[arg(long, global = true, env = "TRAILCAM_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Remote backend credential (overrides config).
    #[arg(long, global = true, env = "TRAILCAM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Write the run summary as JSON to this file.
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,

    /// Suppress progress output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: trace+ORT debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
