//! Local general-purpose detector (YOLOv8-family ONNX export).

use super::{BackendIdentity, BoundingBox, Detector, RawDetection};
use crate::config::{BackendKind, LocalModelConfig};
use crate::constants::local_model::{BOX_COORDS, MAX_DETECTIONS};
use crate::error::{Error, Result};
use image::DynamicImage;
use image::imageops::FilterType;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// COCO class names (80 classes), in model output order.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Offline detector backed by ONNX Runtime.
///
/// Inference is serialized through the session lock.
pub struct LocalDetector {
    session: Mutex<Session>,
    identity: BackendIdentity,
    input_size: u32,
    iou_threshold: f32,
    candidate_floor: f32,
}

impl LocalDetector {
    /// Load the model at `model_path`.
    ///
    /// Failure here is fatal to the run.
    pub fn load(config: &LocalModelConfig, model_path: &Path) -> Result<Self> {
        if !model_path.is_file() {
            return Err(Error::ModelLoad {
                path: model_path.to_path_buf(),
                reason: "model file not found (run `trailcam model fetch` or set local.model_path)"
                    .to_string(),
            });
        }

        let builder = Session::builder().map_err(|e| load_error(model_path, e))?;
        let (mut builder, provider) = configure_provider(builder, model_path)?;
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, e))?;

        info!(
            "Loaded model {} ({}px input, {})",
            model_path.display(),
            config.input_size,
            provider.label()
        );

        Ok(Self {
            session: Mutex::new(session),
            identity: BackendIdentity {
                kind: BackendKind::Local,
                model: config.model_name.clone(),
            },
            input_size: config.input_size,
            iou_threshold: config.iou_threshold,
            candidate_floor: config.candidate_floor,
        })
    }

    fn run_inference(&self, input: Vec<f32>) -> Result<(Vec<i64>, Vec<f32>)> {
        let size = self.input_size as usize;
        let tensor = Tensor::from_array(([1usize, 3, size, size], input)).map_err(inference_error)?;

        let mut session = self.session.lock().map_err(|_| Error::Inference {
            reason: "session lock poisoned".to_string(),
        })?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(inference_error)?;

        let output = outputs
            .get("output0")
            .or_else(|| outputs.get("output"))
            .ok_or_else(|| Error::Inference {
                reason: "model has no detection output".to_string(),
            })?;
        let (shape, data) = output.try_extract_tensor::<f32>().map_err(inference_error)?;

        Ok((shape.to_vec(), data.to_vec()))
    }
}

impl Detector for LocalDetector {
    fn identity(&self) -> &BackendIdentity {
        &self.identity
    }

    fn detect(&self, image: &[u8]) -> Result<Vec<RawDetection>> {
        let decoded = image::load_from_memory(image).map_err(|e| Error::ImageDecode {
            reason: e.to_string(),
        })?;

        let input = preprocess(&decoded, self.input_size);
        let (shape, data) = self.run_inference(input)?;

        #[allow(clippy::cast_precision_loss)]
        let scale = (
            decoded.width() as f32 / self.input_size as f32,
            decoded.height() as f32 / self.input_size as f32,
        );
        let candidates = decode_output(&shape, &data, self.candidate_floor, scale)?;
        let candidate_count = candidates.len();

        let mut detections = non_max_suppression(candidates, self.iou_threshold);
        detections.truncate(MAX_DETECTIONS);

        debug!(
            "{} candidates above floor, {} after NMS",
            candidate_count,
            detections.len()
        );
        Ok(detections)
    }
}

/// Execution provider a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    Cpu,
    Cuda,
    CudaUnavailable,
}

impl Provider {
    const fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Cuda => "CUDA",
            Self::CudaUnavailable => "CPU, CUDA unavailable",
        }
    }
}

const fn select_provider(cuda_built: bool, cuda_available: bool) -> Provider {
    match (cuda_built, cuda_available) {
        (false, _) => Provider::Cpu,
        (true, true) => Provider::Cuda,
        (true, false) => Provider::CudaUnavailable,
    }
}

/// Register the CUDA provider when built with the `cuda` feature and a
/// device is present; otherwise the session stays on the CPU.
#[cfg(feature = "cuda")]
fn configure_provider(builder: SessionBuilder, path: &Path) -> Result<(SessionBuilder, Provider)> {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

    let cuda = CUDAExecutionProvider::default();
    let provider = select_provider(true, cuda.is_available().unwrap_or(false));
    if provider == Provider::Cuda {
        let builder = builder
            .with_execution_providers([cuda.build()])
            .map_err(|e| load_error(path, e))?;
        return Ok((builder, provider));
    }

    tracing::warn!("Built with CUDA support but no CUDA device is available, using CPU");
    Ok((builder, provider))
}

#[cfg(not(feature = "cuda"))]
#[allow(clippy::unnecessary_wraps)]
fn configure_provider(builder: SessionBuilder, _path: &Path) -> Result<(SessionBuilder, Provider)> {
    Ok((builder, select_provider(false, false)))
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn inference_error(e: impl std::fmt::Display) -> Error {
    Error::Inference {
        reason: e.to_string(),
    }
}

/// Resize to a square input and lay out as CHW floats in `[0, 1]`.
fn preprocess(image: &DynamicImage, size: u32) -> Vec<f32> {
    let rgb = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let plane = (size as usize) * (size as usize);
    let mut input = vec![0.0_f32; 3 * plane];

    for (i, pixel) in rgb.pixels().enumerate() {
        for (c, &value) in pixel.0.iter().enumerate() {
            input[c * plane + i] = f32::from(value) / 255.0;
        }
    }
    input
}

/// Decode a raw `[1, 4 + classes, N]` or `[1, N, 4 + classes]` output.
///
/// Each anchor keeps its best class; anchors scoring below `floor` are
/// dropped. Boxes are converted from centre/size in model space to corners in
/// source pixel space using `scale` (source / model, per axis).
pub fn decode_output(
    shape: &[i64],
    data: &[f32],
    floor: f32,
    scale: (f32, f32),
) -> Result<Vec<RawDetection>> {
    let features = BOX_COORDS + COCO_CLASSES.len();
    let dims: Vec<usize> = shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| unexpected_shape(shape))?;

    let (anchors, features_first) = match dims.as_slice() {
        [1, f, n] if *f == features => (*n, true),
        [1, n, f] if *f == features => (*n, false),
        _ => return Err(unexpected_shape(shape)),
    };

    if data.len() < anchors * features {
        return Err(Error::Inference {
            reason: format!(
                "output holds {} values, expected {}",
                data.len(),
                anchors * features
            ),
        });
    }

    let at = |anchor: usize, feature: usize| {
        if features_first {
            data[feature * anchors + anchor]
        } else {
            data[anchor * features + feature]
        }
    };

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let mut best = (0usize, f32::MIN);
        for class in 0..COCO_CLASSES.len() {
            let score = at(anchor, BOX_COORDS + class);
            if score > best.1 {
                best = (class, score);
            }
        }

        let (class, score) = best;
        if !score.is_finite() || score < floor {
            continue;
        }

        let (cx, cy, w, h) = (
            at(anchor, 0),
            at(anchor, 1),
            at(anchor, 2),
            at(anchor, 3),
        );
        detections.push(RawDetection {
            label: COCO_CLASSES[class].to_string(),
            confidence: score.clamp(0.0, 1.0),
            bbox: BoundingBox {
                x1: ((cx - w / 2.0) * scale.0).max(0.0),
                y1: ((cy - h / 2.0) * scale.1).max(0.0),
                x2: (cx + w / 2.0) * scale.0,
                y2: (cy + h / 2.0) * scale.1,
            },
        });
    }

    Ok(detections)
}

fn unexpected_shape(shape: &[i64]) -> Error {
    Error::Inference {
        reason: format!(
            "unexpected output shape {shape:?}, expected [1, {0}, N] or [1, N, {0}]",
            BOX_COORDS + COCO_CLASSES.len()
        ),
    }
}

/// Class-aware greedy non-maximum suppression.
///
/// Output is sorted by descending confidence; ties keep input order.
pub fn non_max_suppression(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.label == candidate.label && iou(&k.bbox, &candidate.bbox) > iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two boxes.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter = BoundingBox {
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
        x2: a.x2.min(b.x2),
        y2: a.y2.min(b.y2),
    }
    .area();

    let union = a.area() + b.area() - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FEATURES: usize = 84;
    const HORSE: usize = 17;
    const BIRD: usize = 14;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox { x1, y1, x2, y2 }
    }

    fn det(label: &str, confidence: f32, b: BoundingBox) -> RawDetection {
        RawDetection {
            label: label.to_string(),
            confidence,
            bbox: b,
        }
    }

    /// Two anchors: a confident horse and a faint bird.
    fn anchors() -> [[f32; FEATURES]; 2] {
        let mut rows = [[0.0_f32; FEATURES]; 2];
        rows[0][..4].copy_from_slice(&[50.0, 50.0, 20.0, 10.0]);
        rows[0][BOX_COORDS + HORSE] = 0.8;
        rows[1][..4].copy_from_slice(&[10.0, 10.0, 4.0, 4.0]);
        rows[1][BOX_COORDS + BIRD] = 0.02;
        rows
    }

    fn assert_horse(detections: &[RawDetection]) {
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.label, "horse");
        assert!((d.confidence - 0.8).abs() < f32::EPSILON);
        assert_eq!(d.bbox, bbox(80.0, 45.0, 120.0, 55.0));
    }

    #[test]
    fn test_provider_selection() {
        assert_eq!(select_provider(false, true), Provider::Cpu);
        assert_eq!(select_provider(true, true), Provider::Cuda);
        assert_eq!(select_provider(true, false), Provider::CudaUnavailable);
        assert_eq!(Provider::CudaUnavailable.label(), "CPU, CUDA unavailable");
    }

    #[test]
    fn test_coco_vocabulary_size() {
        assert_eq!(COCO_CLASSES.len() + BOX_COORDS, FEATURES);
        assert_eq!(COCO_CLASSES[HORSE], "horse");
        assert_eq!(COCO_CLASSES[BIRD], "bird");
    }

    #[test]
    fn test_decode_features_first_layout() {
        let rows = anchors();
        let mut data = vec![0.0_f32; FEATURES * 2];
        for (anchor, row) in rows.iter().enumerate() {
            for (feature, &value) in row.iter().enumerate() {
                data[feature * 2 + anchor] = value;
            }
        }
        let detections = decode_output(&[1, 84, 2], &data, 0.05, (2.0, 1.0)).unwrap();
        assert_horse(&detections);
    }

    #[test]
    fn test_decode_anchors_first_layout() {
        let data: Vec<f32> = anchors().iter().flatten().copied().collect();
        let detections = decode_output(&[1, 2, 84], &data, 0.05, (2.0, 1.0)).unwrap();
        assert_horse(&detections);
    }

    #[test]
    fn test_decode_rejects_unexpected_shape() {
        let err = decode_output(&[1, 85, 2], &[0.0; 170], 0.05, (1.0, 1.0)).unwrap_err();
        assert_eq!(err.reason_code(), "inference_failed");
        assert!(decode_output(&[1, 84, 2], &[0.0; 10], 0.05, (1.0, 1.0)).is_err());
    }

    #[test]
    fn test_iou() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        assert!((iou(&a, &a) - 1.0).abs() < f32::EPSILON);
        assert!(iou(&a, &bbox(20.0, 20.0, 30.0, 30.0)).abs() < f32::EPSILON);
        let half = iou(&a, &bbox(5.0, 0.0, 15.0, 10.0));
        assert!((half - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let kept = non_max_suppression(
            vec![
                det("horse", 0.7, bbox(1.0, 1.0, 11.0, 11.0)),
                det("horse", 0.9, bbox(0.0, 0.0, 10.0, 10.0)),
                det("dog", 0.8, bbox(0.0, 0.0, 10.0, 10.0)),
            ],
            0.45,
        );
        let labels: Vec<_> = kept.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["horse", "dog"]);
        assert!((kept[0].confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let kept = non_max_suppression(
            vec![
                det("bird", 0.5, bbox(0.0, 0.0, 10.0, 10.0)),
                det("bird", 0.6, bbox(50.0, 50.0, 60.0, 60.0)),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
        assert!(kept[0].confidence > kept[1].confidence);
    }

    #[test]
    fn test_load_missing_model_is_model_load_error() {
        let err = LocalDetector::load(
            &LocalModelConfig::default(),
            Path::new("/nonexistent/yolov8n.onnx"),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::ModelLoad { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_preprocess_layout() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            4,
            4,
            image::Rgb([255, 0, 51]),
        ));
        let input = preprocess(&image, 2);
        assert_eq!(input.len(), 12);
        assert!(input[..4].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(input[4..8].iter().all(|&v| v.abs() < 1e-6));
        assert!(input[8..].iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }
}
