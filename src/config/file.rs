//! Configuration file loading.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file.
///
/// Returns default config if the file does not exist.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load configuration from an explicit path, or the platform default.
///
/// An explicit path that does not exist is an error; a missing default file
/// yields the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) if !path.exists() => Err(Error::ConfigRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        }),
        Some(path) => load_config_file(path),
        None => load_default_config(),
    }
}

/// Load configuration from the default platform-specific path.
pub fn load_default_config() -> Result<Config> {
    super::config_file_path().map_or_else(|_| Ok(Config::default()), |path| load_config_file(&path))
}

/// Save configuration to a TOML file.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::ConfigWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;

    std::fs::write(path, contents).map_err(|e| Error::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, Placement};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_nonexistent_file_returns_default() {
        let config = load_config_file(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.defaults.backend, BackendKind::Local);
        assert!(config.remote.endpoint.is_none());
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let result = load_config(Some(Path::new("/nonexistent/trailcam.toml")));
        assert!(matches!(result, Err(Error::ConfigRead { .. })));
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[defaults]
confidence_threshold = 0.45
backend = "remote"
placement = "by-date"
save_all = true
move_originals = true

[remote]
endpoint = "https://detect.example.org/v1/detect"
max_attempts = 5
"#
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.defaults.confidence_threshold, 0.45);
        assert_eq!(config.defaults.backend, BackendKind::Remote);
        assert_eq!(config.defaults.placement, Placement::ByDate);
        assert!(config.defaults.save_all);
        assert!(config.defaults.move_originals);
        assert_eq!(config.remote.max_attempts, 5);
        // Unspecified fields keep their defaults
        assert_eq!(config.local.input_size, 640);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        assert!(matches!(
            load_config_file(file.path()),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_save_then_load_preserves_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.defaults.recursive = true;
        config.local.model_url = Some("https://models.example.org/yolov8n.onnx".to_string());
        save_config(&config, &path).unwrap();

        let loaded = load_config_file(&path).unwrap();
        assert!(loaded.defaults.recursive);
        assert_eq!(loaded.local.model_url, config.local.model_url);
    }
}
