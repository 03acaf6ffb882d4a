//! Detection backends and result normalization.

mod filter;
mod labels;
mod local;
mod remote;
mod retry;

pub use filter::filter;
pub use labels::{Canonical, canonicalize, normalize_label};
pub use local::{COCO_CLASSES, LocalDetector, decode_output, iou, non_max_suppression};
pub use remote::{
    HttpTransport, RemoteDetector, RemoteTransport, classify_status, parse_response,
};
pub use retry::{RetryPolicy, TransportError};

use crate::config::{BackendKind, Config};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Axis-aligned box in source image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
}

impl BoundingBox {
    /// Box area, zero for degenerate boxes.
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// One object instance as reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Label in the backend's own vocabulary.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Location in the source image.
    pub bbox: BoundingBox,
}

/// Which backend produced a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendIdentity {
    /// Backend variant.
    pub kind: BackendKind,
    /// Model name or version string.
    pub model: String,
}

/// A raw detection after label mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDetection {
    /// Canonical species or category name.
    pub name: String,
    /// Label as reported by the backend.
    pub raw_label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Location in the source image.
    pub bbox: BoundingBox,
    /// Whether the label had an entry in the lookup table.
    pub mapped: bool,
}

/// Common detection contract shared by every backend.
pub trait Detector: Send + Sync {
    /// Backend identity recorded alongside results.
    fn identity(&self) -> &BackendIdentity;

    /// Run detection over encoded image bytes.
    ///
    /// Detections are returned in backend emission order.
    fn detect(&self, image: &[u8]) -> Result<Vec<RawDetection>>;
}

/// Normalized outcome for one photo.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// All detections, canonicalized, in emission order.
    pub detections: Vec<CanonicalDetection>,
    /// Detections at or above the threshold, in emission order.
    pub filtered: Vec<CanonicalDetection>,
    /// True iff `filtered` is non-empty.
    pub has_wildlife: bool,
    /// Backend that produced the detections.
    pub backend: BackendIdentity,
    /// Threshold applied.
    pub threshold: f32,
}

impl DetectionResult {
    /// Canonicalize and filter raw backend output.
    pub fn from_raw(raw: &[RawDetection], backend: &BackendIdentity, threshold: f32) -> Self {
        let detections: Vec<CanonicalDetection> = raw
            .iter()
            .map(|d| {
                let canonical = canonicalize(&d.label, backend.kind);
                CanonicalDetection {
                    name: canonical.name,
                    raw_label: d.label.clone(),
                    confidence: d.confidence,
                    bbox: d.bbox,
                    mapped: canonical.mapped,
                }
            })
            .collect();

        let (filtered, has_wildlife) = filter(&detections, threshold);

        Self {
            detections,
            filtered,
            has_wildlife,
            backend: backend.clone(),
            threshold,
        }
    }

    /// Deduplicated species names in the filtered set, first-seen order.
    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = Vec::new();
        for d in &self.filtered {
            if !species.contains(&d.name) {
                species.push(d.name.clone());
            }
        }
        species
    }

    /// Raw labels without a table entry, deduplicated, first-seen order.
    pub fn unmapped_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for d in self.detections.iter().filter(|d| !d.mapped) {
            if !labels.contains(&d.raw_label) {
                labels.push(d.raw_label.clone());
            }
        }
        labels
    }
}

/// Build the backend selected for this run.
///
/// Failure here is fatal to the whole run.
pub fn build_detector(config: &Config, model_path: &Path) -> Result<Box<dyn Detector>> {
    match config.defaults.backend {
        BackendKind::Local => {
            let detector = LocalDetector::load(&config.local, model_path)?;
            info!("Using local model {}", detector.identity().model);
            Ok(Box::new(detector))
        }
        BackendKind::Remote => {
            let detector = RemoteDetector::from_config(&config.remote)?;
            info!("Using remote backend {}", detector.identity().model);
            Ok(Box::new(detector))
        }
    }
}
