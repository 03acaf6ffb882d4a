//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config, load_config_file, load_default_config, save_config};
pub use paths::{config_dir, config_file_path, default_model_path, models_dir};
pub use types::{
    BackendKind, Config, DefaultsConfig, LocalModelConfig, Placement, RemoteConfig,
};
pub use validate::validate_config;
