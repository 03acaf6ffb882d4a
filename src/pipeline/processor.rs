//! Single photo processing pipeline.

use crate::config::Placement;
use crate::detect::{DetectionResult, Detector, RawDetection};
use crate::error::Error;
use crate::output::{ArtifactReservation, SidecarRecord, destination_dir, file_stem, photo_file_name};
use crate::photo::{Photo, ResolvedTimestamp, resolve_timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Lifecycle of one photo through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoStage {
    /// Enumerated, not started.
    Pending,
    /// Reading bytes and capture time.
    Resolving,
    /// Waiting on the backend.
    Detecting,
    /// Canonicalizing and thresholding.
    Filtering,
    /// Writing the photo and sidecar.
    Placing,
    /// Artifacts committed.
    Done,
    /// Aborted; see the failure record.
    Failed,
}

impl std::fmt::Display for PhotoStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Detecting => "detecting",
            Self::Filtering => "filtering",
            Self::Placing => "placing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Immutable settings for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Directory enumerated for photos.
    pub input_dir: PathBuf,
    /// Root of the output tree.
    pub output_dir: PathBuf,
    /// Confidence threshold.
    pub threshold: f32,
    /// Keep photos without wildlife.
    pub save_all: bool,
    /// Move retained originals instead of copying them.
    pub move_originals: bool,
    /// Destination layout.
    pub placement: Placement,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Cap on species in a filename.
    pub max_species_in_name: Option<usize>,
    /// Show a progress bar.
    pub show_progress: bool,
}

/// A photo that stopped before `Done`.
#[derive(Debug, thiserror::Error)]
#[error("failed while {stage}: {source}")]
pub struct PhotoFailure {
    /// Stage the photo was in.
    pub stage: PhotoStage,
    /// Underlying error.
    #[source]
    pub source: Error,
}

/// Timestamp and normalized detections for one photo.
#[derive(Debug, Clone)]
pub struct PhotoAnalysis {
    /// Resolved capture time.
    pub timestamp: ResolvedTimestamp,
    /// Backend output as reported.
    pub raw: Vec<RawDetection>,
    /// Canonicalized and filtered result.
    pub result: DetectionResult,
}

/// Artifacts written for a photo that reached `Done`.
#[derive(Debug, Clone)]
pub struct PhotoOutcome {
    /// Whether wildlife passed the threshold.
    pub has_wildlife: bool,
    /// Whether the photo itself was copied.
    pub photo_retained: bool,
    /// Species in the filename.
    pub species: Vec<String>,
    /// Photo path when retained.
    pub photo_path: Option<PathBuf>,
    /// Sidecar path.
    pub sidecar_path: PathBuf,
}

struct Tracker<'a> {
    path: &'a Path,
    stage: PhotoStage,
}

impl<'a> Tracker<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            stage: PhotoStage::Pending,
        }
    }

    fn enter(&mut self, stage: PhotoStage) {
        trace!("{}: {} -> {}", self.path.display(), self.stage, stage);
        self.stage = stage;
    }

    fn fail(&self, source: Error) -> PhotoFailure {
        trace!("{}: {} -> {}", self.path.display(), self.stage, PhotoStage::Failed);
        PhotoFailure {
            stage: self.stage,
            source,
        }
    }
}

/// Resolve, detect and filter one photo without writing anything.
pub fn analyze_photo(
    photo: &Photo,
    detector: &dyn Detector,
    threshold: f32,
) -> Result<PhotoAnalysis, PhotoFailure> {
    let mut tracker = Tracker::new(photo.path());
    analyze(photo, detector, threshold, &mut tracker)
}

fn analyze(
    photo: &Photo,
    detector: &dyn Detector,
    threshold: f32,
    tracker: &mut Tracker<'_>,
) -> Result<PhotoAnalysis, PhotoFailure> {
    tracker.enter(PhotoStage::Resolving);
    let bytes = photo.read_bytes().map_err(|e| tracker.fail(e))?;
    let timestamp = resolve_timestamp(photo.path(), &bytes);

    tracker.enter(PhotoStage::Detecting);
    let raw = detector.detect(&bytes).map_err(|e| tracker.fail(e))?;
    drop(bytes);

    tracker.enter(PhotoStage::Filtering);
    let result = DetectionResult::from_raw(&raw, detector.identity(), threshold);
    for label in result.unmapped_labels() {
        warn!("Unmapped label '{label}' in {}", photo.file_name());
    }
    debug!(
        "{} detections, {} at or above {:.2}",
        result.detections.len(),
        result.filtered.len(),
        threshold
    );

    Ok(PhotoAnalysis {
        timestamp,
        raw,
        result,
    })
}

/// Run the full pipeline for one photo and commit its artifacts.
pub fn process_photo(
    photo: &Photo,
    detector: &dyn Detector,
    config: &RunConfig,
) -> Result<PhotoOutcome, PhotoFailure> {
    let mut tracker = Tracker::new(photo.path());
    let analysis = analyze(photo, detector, config.threshold, &mut tracker)?;

    tracker.enter(PhotoStage::Placing);
    let outcome = place(photo, analysis, config).map_err(|e| tracker.fail(e))?;

    tracker.enter(PhotoStage::Done);
    Ok(outcome)
}

fn place(
    photo: &Photo,
    analysis: PhotoAnalysis,
    config: &RunConfig,
) -> crate::error::Result<PhotoOutcome> {
    let PhotoAnalysis {
        timestamp,
        raw,
        result,
    } = analysis;

    let has_wildlife = result.has_wildlife;
    let species = result.species();
    let retain = has_wildlife || config.save_all;
    let extension = photo.extension();

    let stem = file_stem(
        &timestamp.value,
        &species,
        has_wildlife,
        config.max_species_in_name,
    );
    let dir = destination_dir(&config.output_dir, config.placement, &timestamp.value, &species);

    let mut reservation = ArtifactReservation::reserve(&dir, &stem, extension.as_deref())?;
    let photo_file = if retain {
        reservation.write_photo(photo.path(), config.move_originals)?;
        Some(photo_file_name(reservation.stem(), extension.as_deref()))
    } else {
        None
    };
    let photo_path = retain.then(|| reservation.photo_path().to_path_buf());

    let record = SidecarRecord::new(photo, timestamp, raw, result, photo_file);
    let json = record.to_json(reservation.sidecar_path())?;
    let sidecar_path = reservation.commit(&json)?;

    Ok(PhotoOutcome {
        has_wildlife,
        photo_retained: retain,
        species,
        photo_path,
        sidecar_path,
    })
}
