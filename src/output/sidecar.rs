//! Per-photo sidecar records.
//!
//! The field set is a stable contract for external readers; additions bump
//! `schema_version`.

use crate::constants::sidecar::SCHEMA_VERSION;
use crate::detect::{BackendIdentity, CanonicalDetection, DetectionResult, RawDetection};
use crate::error::{Error, Result};
use crate::photo::{Photo, ResolvedTimestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full detection record for one processed photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidecarRecord {
    /// Record layout version.
    pub schema_version: u32,
    /// Source file name.
    pub source_file: String,
    /// Source file path as enumerated.
    pub source_path: PathBuf,
    /// Renamed photo file name, absent when the photo was not retained.
    pub photo_file: Option<String>,
    /// Whether the photo itself was copied to the output.
    pub photo_retained: bool,
    /// When the record was written.
    pub processed_at: DateTime<Utc>,
    /// Resolved capture time and its origin.
    pub timestamp: ResolvedTimestamp,
    /// Backend that produced the detections.
    pub backend: BackendIdentity,
    /// Confidence threshold applied.
    pub threshold: f32,
    /// Whether any detection passed the threshold.
    pub has_wildlife: bool,
    /// Species embedded in the file name.
    pub species: Vec<String>,
    /// Backend output as reported.
    pub raw_detections: Vec<RawDetection>,
    /// All detections after label mapping.
    pub detections: Vec<CanonicalDetection>,
    /// Detections at or above the threshold.
    pub filtered_detections: Vec<CanonicalDetection>,
    /// Raw labels with no table entry.
    pub unmapped_labels: Vec<String>,
}

impl SidecarRecord {
    /// Assemble the record for one photo.
    pub fn new(
        photo: &Photo,
        timestamp: ResolvedTimestamp,
        raw: Vec<RawDetection>,
        result: DetectionResult,
        photo_file: Option<String>,
    ) -> Self {
        let species = result.species();
        let unmapped_labels = result.unmapped_labels();

        Self {
            schema_version: SCHEMA_VERSION,
            source_file: photo.file_name().into_owned(),
            source_path: photo.path().to_path_buf(),
            photo_retained: photo_file.is_some(),
            photo_file,
            processed_at: Utc::now(),
            timestamp,
            backend: result.backend,
            threshold: result.threshold,
            has_wildlife: result.has_wildlife,
            species,
            raw_detections: raw,
            detections: result.detections,
            filtered_detections: result.filtered,
            unmapped_labels,
        }
    }

    /// Serialize as pretty JSON destined for `path`.
    pub fn to_json(&self, path: &Path) -> Result<Vec<u8>> {
        let mut json = serde_json::to_vec_pretty(self).map_err(|e| Error::JsonWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        json.push(b'\n');
        Ok(json)
    }
}

/// Read a sidecar back from disk.
pub fn read_sidecar(path: &Path) -> Result<SidecarRecord> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::JsonRead {
        path: path.to_path_buf(),
        source: e,
    })
}
