//! Batch driver: enumerate, process, isolate failures, summarize.

use super::processor::{RunConfig, process_photo};
use crate::detect::Detector;
use crate::error::{Error, Result};
use crate::output::progress;
use crate::output::{FailureRecord, RunSummary};
use crate::photo::collect_photos;
use std::fs::{self, File};
use std::path::Path;
use tracing::{error, info};

/// Runs the per-photo pipeline over an input directory.
pub struct BatchDriver {
    config: RunConfig,
    detector: Box<dyn Detector>,
}

impl BatchDriver {
    /// Create a driver for one run. Both values are fixed for the run.
    pub fn new(config: RunConfig, detector: Box<dyn Detector>) -> Self {
        Self { config, detector }
    }

    /// Process every photo and return the summary.
    ///
    /// Only run-level problems (missing input directory, unwritable output
    /// directory) are returned as errors, and always before any photo is
    /// processed. Per-photo failures end up in the summary.
    pub fn run(&self) -> Result<RunSummary> {
        let photos = collect_photos(&self.config.input_dir, self.config.recursive)?;
        ensure_output_writable(&self.config.output_dir)?;

        info!(
            "Found {} photos in {}",
            photos.len(),
            self.config.input_dir.display()
        );

        let mut summary = RunSummary::new(photos.len());
        let pb = progress::create_photo_progress(photos.len(), self.config.show_progress);

        for (i, photo) in photos.iter().enumerate() {
            progress::set_current(pb.as_ref(), &photo.file_name());
            info!(
                "[{}/{}] Processing: {}",
                i + 1,
                photos.len(),
                photo.path().display()
            );

            match process_photo(photo, self.detector.as_ref(), &self.config) {
                Ok(outcome) => {
                    info!(
                        "Done: {} ({})",
                        outcome.sidecar_path.display(),
                        if outcome.has_wildlife {
                            outcome.species.join(", ")
                        } else {
                            "no wildlife".to_string()
                        }
                    );
                    summary.record_done(
                        outcome.has_wildlife,
                        outcome.photo_retained,
                        &outcome.species,
                    );
                }
                Err(failure) => {
                    error!("Failed: {} ({failure})", photo.path().display());
                    summary.record_failure(FailureRecord {
                        path: photo.path().to_path_buf(),
                        stage: failure.stage,
                        reason: failure.source.reason_code().to_string(),
                        message: failure.source.to_string(),
                    });
                }
            }

            progress::inc_progress(pb.as_ref());
        }

        progress::finish_progress(pb, "Batch complete");
        summary.finish();
        Ok(summary)
    }
}

/// Create the output directory if needed and prove it accepts writes.
pub fn ensure_output_writable(dir: &Path) -> Result<()> {
    let not_writable = |e| Error::OutputDirNotWritable {
        path: dir.to_path_buf(),
        source: e,
    };

    fs::create_dir_all(dir).map_err(not_writable)?;

    let marker = dir.join(format!(".trailcam-write-check-{}", std::process::id()));
    File::create(&marker).map_err(not_writable)?;
    let _ = fs::remove_file(&marker);
    Ok(())
}
