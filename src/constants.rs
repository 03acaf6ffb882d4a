//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "trailcam";

/// Default minimum confidence for a detection to count.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Supported input image extensions (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

/// Suffix appended to files while they are being written.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Confidence bounds.
pub mod confidence {
    /// Lowest legal threshold.
    pub const MIN: f32 = 0.0;
    /// Highest legal threshold.
    pub const MAX: f32 = 1.0;
}

/// Output naming constants.
pub mod naming {
    /// Date component format (day precision).
    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    /// Time component format (second precision).
    pub const TIME_FORMAT: &str = "%H-%M-%S";

    /// Separator between filename components.
    pub const SEPARATOR: char = '_';

    /// Marker appended when no wildlife passed the threshold.
    pub const NO_WILDLIFE_SUFFIX: &str = "no_wildlife";

    /// Separator between a stem and its collision counter.
    pub const COUNTER_SEPARATOR: char = '-';

    /// First counter used once the bare stem is taken.
    pub const FIRST_COUNTER: u32 = 2;

    /// Upper bound on collision counters before giving up.
    pub const MAX_COUNTER: u32 = 10_000;

    /// Byte budget for a stem. Leaves room for the largest counter, the
    /// extension and the partial suffix within a 255-byte file name.
    pub const MAX_STEM_BYTES: usize = 200;

    /// Directory used for photos without wildlife in by-species placement.
    pub const NO_WILDLIFE_DIR: &str = "no_wildlife";
}

/// Sidecar record constants.
pub mod sidecar {
    /// Sidecar file extension.
    pub const EXTENSION: &str = "json";

    /// Schema version written into every sidecar.
    pub const SCHEMA_VERSION: u32 = 1;
}

/// Local model constants.
pub mod local_model {
    /// Default model file name inside the models directory.
    pub const DEFAULT_MODEL_FILE: &str = "yolov8n.onnx";

    /// Model identity reported in sidecars.
    pub const DEFAULT_MODEL_NAME: &str = "yolov8n";

    /// Default square input size in pixels.
    pub const DEFAULT_INPUT_SIZE: u32 = 640;

    /// Input sizes must be a multiple of the model stride.
    pub const STRIDE: u32 = 32;

    /// Default IoU threshold for non-maximum suppression.
    pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

    /// Candidates scoring below this are never reported.
    pub const DEFAULT_CANDIDATE_FLOOR: f32 = 0.05;

    /// Maximum detections reported per image.
    pub const MAX_DETECTIONS: usize = 100;

    /// Number of box coordinates preceding the class scores in each row.
    pub const BOX_COORDS: usize = 4;
}

/// Remote backend constants.
pub mod remote {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default connect timeout in seconds.
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Default total attempts per image (first try included).
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Default delay before the first retry in milliseconds.
    pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

    /// Default ceiling for retry delay in milliseconds.
    pub const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;

    /// Default remote model identity.
    pub const DEFAULT_MODEL_NAME: &str = "camera-trap-specialist";
}

/// Download constants.
pub mod download {
    /// Connect timeout for weight downloads in seconds.
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;

    /// Total timeout for weight downloads in seconds.
    pub const TIMEOUT_SECS: u64 = 600;
}
