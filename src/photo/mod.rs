//! Input photos and capture-time resolution.

mod timestamp;

pub use timestamp::{ResolvedTimestamp, TimestampOrigin, read_capture_time, resolve_timestamp};

use crate::constants::IMAGE_EXTENSIONS;
use crate::error::{Error, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Immutable reference to one input image.
///
/// Bytes are read on demand and never cached, so a batch holds at most one
/// image in memory at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    path: PathBuf,
}

impl Photo {
    /// Reference the image at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source file name, lossily converted for display and records.
    pub fn file_name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map_or(Cow::Borrowed("unknown"), |n| n.to_string_lossy())
    }

    /// Lowercased source extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Read the raw image bytes.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| Error::ImageRead {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Enumerate photos in `input_dir`, sorted by path.
///
/// Sorting makes batch order, and therefore collision counters, reproducible.
pub fn collect_photos(input_dir: &Path, recursive: bool) -> Result<Vec<Photo>> {
    if !input_dir.is_dir() {
        return Err(Error::InputDirNotFound {
            path: input_dir.to_path_buf(),
        });
    }

    let mut paths = Vec::new();
    collect_recursive(input_dir, recursive, &mut paths)?;
    paths.sort();

    Ok(paths.into_iter().map(Photo::new).collect())
}

fn collect_recursive(dir: &Path, recursive: bool, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if is_hidden(&path) {
            continue;
        }

        if path.is_dir() {
            if recursive {
                collect_recursive(&path, recursive, paths)?;
            }
        } else if is_image_file(&path) {
            paths.push(path);
        }
    }

    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

/// Check if a file has a supported image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}
