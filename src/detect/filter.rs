//! Confidence filtering.

use super::CanonicalDetection;

/// Keep detections with `confidence >= threshold`.
///
/// Returns the kept detections in input order and whether any were kept.
/// The comparison is exact: a threshold of 1.0 keeps only detections at
/// exactly 1.0.
pub fn filter(detections: &[CanonicalDetection], threshold: f32) -> (Vec<CanonicalDetection>, bool) {
    let kept: Vec<CanonicalDetection> = detections
        .iter()
        .filter(|d| d.confidence >= threshold)
        .cloned()
        .collect();
    let has_wildlife = !kept.is_empty();
    (kept, has_wildlife)
}
