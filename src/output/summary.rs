//! Run-level outcome counts and failure list.

use crate::error::{Error, Result};
use crate::pipeline::PhotoStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One photo that did not reach `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Source path.
    pub path: PathBuf,
    /// Stage the photo was in when it failed.
    pub stage: PhotoStage,
    /// Stable reason code, e.g. `backend_unavailable`.
    pub reason: String,
    /// Human-readable detail.
    pub message: String,
}

/// Aggregated outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Machine that ran the batch.
    pub hostname: String,
    /// Run start time.
    pub started_at: DateTime<Utc>,
    /// Run end time, set when the batch finishes.
    pub finished_at: Option<DateTime<Utc>>,
    /// Photos enumerated.
    pub total: usize,
    /// Done, wildlife present.
    pub done_with_wildlife: usize,
    /// Done, no wildlife, photo kept.
    pub done_without_wildlife_retained: usize,
    /// Done, no wildlife, only the sidecar written.
    pub done_without_wildlife_skipped: usize,
    /// Photos that failed.
    pub failed: usize,
    /// Photos per canonical species.
    pub species: BTreeMap<String, usize>,
    /// Failure details in processing order.
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    /// Start an empty summary for `total` photos.
    pub fn new(total: usize) -> Self {
        Self {
            hostname: hostname::get().map_or_else(
                |_| "unknown".to_string(),
                |h| h.to_string_lossy().into_owned(),
            ),
            started_at: Utc::now(),
            finished_at: None,
            total,
            done_with_wildlife: 0,
            done_without_wildlife_retained: 0,
            done_without_wildlife_skipped: 0,
            failed: 0,
            species: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Count a photo that reached `Done`.
    pub fn record_done(&mut self, has_wildlife: bool, photo_retained: bool, species: &[String]) {
        match (has_wildlife, photo_retained) {
            (true, _) => self.done_with_wildlife += 1,
            (false, true) => self.done_without_wildlife_retained += 1,
            (false, false) => self.done_without_wildlife_skipped += 1,
        }
        for name in species {
            *self.species.entry(name.clone()).or_default() += 1;
        }
    }

    /// Count a photo that failed.
    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.failed += 1;
        self.failures.push(failure);
    }

    /// Photos that reached `Done`.
    pub fn completed(&self) -> usize {
        self.done_with_wildlife
            + self.done_without_wildlife_retained
            + self.done_without_wildlife_skipped
    }

    /// Mark the run finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Log the summary at the end of a run.
    pub fn log(&self) {
        info!(
            "Processed {} photos: {} with wildlife, {} without (retained), {} without (sidecar only), {} failed",
            self.total,
            self.done_with_wildlife,
            self.done_without_wildlife_retained,
            self.done_without_wildlife_skipped,
            self.failed
        );
        for (name, count) in &self.species {
            info!("  {name}: {count}");
        }
        for failure in &self.failures {
            warn!(
                "Failed {} while {}: {} ({})",
                failure.path.display(),
                failure.stage,
                failure.reason,
                failure.message
            );
        }
    }

    /// Write the summary as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::JsonWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| Error::ArtifactWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
