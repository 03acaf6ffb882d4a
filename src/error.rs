//! Error types for trailcam.

/// Result type alias for trailcam operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for trailcam.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Input directory does not exist or is not a directory.
    #[error("input directory does not exist: {path}")]
    InputDirNotFound {
        /// Path that was given as input.
        path: std::path::PathBuf,
    },

    /// Output directory cannot be created or written to.
    #[error("output directory is not writable: {path}")]
    OutputDirNotWritable {
        /// Path to the output directory.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Detection model could not be initialized.
    #[error("failed to load detection model '{path}': {reason}")]
    ModelLoad {
        /// Path to the model file.
        path: std::path::PathBuf,
        /// Description of the load failure.
        reason: String,
    },

    /// Detection backend could not be set up.
    #[error("failed to initialize detection backend: {reason}")]
    BackendInit {
        /// Description of the setup failure.
        reason: String,
    },

    /// Download failed.
    #[error("failed to download from '{url}'")]
    DownloadFailed {
        /// URL that failed.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Downloaded file did not match its expected checksum.
    #[error("checksum mismatch for '{path}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Path to the downloaded file.
        path: std::path::PathBuf,
        /// Expected SHA-256 digest (hex).
        expected: String,
        /// Actual SHA-256 digest (hex).
        actual: String,
    },

    /// Image file could not be read from disk.
    #[error("failed to read image '{path}'")]
    ImageRead {
        /// Path to the image file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Image bytes could not be decoded.
    #[error("failed to decode image: {reason}")]
    ImageDecode {
        /// Description of the decode failure.
        reason: String,
    },

    /// Remote backend could not be reached within the retry budget.
    #[error("detection backend unavailable after {attempts} attempt(s): {reason}")]
    BackendUnavailable {
        /// Number of attempts made.
        attempts: u32,
        /// Description of the last failure.
        reason: String,
    },

    /// Remote backend rejected the request or returned an unusable response.
    #[error("detection backend error: {reason}")]
    BackendRejected {
        /// Description of the rejection.
        reason: String,
    },

    /// Local inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Failed to write an output artifact.
    #[error("failed to write artifact '{path}'")]
    ArtifactWrite {
        /// Path to the artifact.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize a JSON record.
    #[error("failed to serialize JSON for '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: std::path::PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to parse a JSON record.
    #[error("failed to parse JSON in '{path}'")]
    JsonRead {
        /// Path to the JSON file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Whether this error aborts the whole run rather than a single photo.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigDirNotFound
                | Self::ConfigRead { .. }
                | Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::InputDirNotFound { .. }
                | Self::OutputDirNotWritable { .. }
                | Self::ModelLoad { .. }
                | Self::BackendInit { .. }
                | Self::DownloadFailed { .. }
                | Self::ChecksumMismatch { .. }
        )
    }

    /// Stable reason code recorded for per-photo failures.
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::ImageRead { .. } | Self::ImageDecode { .. } => "unreadable_image",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::BackendRejected { .. } => "backend_error",
            Self::Inference { .. } => "inference_failed",
            Self::ArtifactWrite { .. } | Self::JsonWrite { .. } => "write_failed",
            Self::Io(_) => "io_error",
            _ => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_unavailable_reason_code() {
        let err = Error::BackendUnavailable {
            attempts: 3,
            reason: "timed out".to_string(),
        };
        assert_eq!(err.reason_code(), "backend_unavailable");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_model_load_is_fatal() {
        let err = Error::ModelLoad {
            path: "model.onnx".into(),
            reason: "missing".to_string(),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_write_failures_share_reason_code() {
        let err = Error::ArtifactWrite {
            path: "out.jpg".into(),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(err.reason_code(), "write_failed");
    }
}
