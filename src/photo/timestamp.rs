//! Capture-time resolution from embedded EXIF metadata.
//!
//! The embedded `DateTimeOriginal` is preferred, then the primary `DateTime`
//! tag. When neither parses, the file's modification time is used. The
//! embedded value is never cross-checked against the filesystem.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Where a resolved timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampOrigin {
    /// Embedded capture metadata.
    Metadata,
    /// Filesystem modification time (or the clock, as a last resort).
    Fallback,
}

/// A photo's capture time together with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTimestamp {
    /// Capture time in camera-local time.
    pub value: NaiveDateTime,
    /// Where the value came from.
    pub origin: TimestampOrigin,
}

/// Resolve the capture time of the image at `path` whose contents are `bytes`.
///
/// Never fails: a fallback always exists.
pub fn resolve_timestamp(path: &Path, bytes: &[u8]) -> ResolvedTimestamp {
    if let Some(value) = read_capture_time(bytes) {
        debug!("Capture time from metadata: {value}");
        return ResolvedTimestamp {
            value,
            origin: TimestampOrigin::Metadata,
        };
    }

    debug!(
        "No usable capture metadata in {}, using file time",
        path.display()
    );
    ResolvedTimestamp {
        value: fallback_time(path),
        origin: TimestampOrigin::Fallback,
    }
}

/// Read the embedded capture time, if present and well-formed.
pub fn read_capture_time(bytes: &[u8]) -> Option<NaiveDateTime> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    [exif::Tag::DateTimeOriginal, exif::Tag::DateTime]
        .into_iter()
        .find_map(|tag| {
            exif.get_field(tag, exif::In::PRIMARY)
                .and_then(|field| parse_exif_datetime(&field.value))
        })
}

fn parse_exif_datetime(value: &exif::Value) -> Option<NaiveDateTime> {
    let exif::Value::Ascii(parts) = value else {
        return None;
    };
    let dt = exif::DateTime::from_ascii(parts.first()?).ok()?;

    NaiveDate::from_ymd_opt(
        i32::from(dt.year),
        u32::from(dt.month),
        u32::from(dt.day),
    )?
    .and_hms_opt(
        u32::from(dt.hour),
        u32::from(dt.minute),
        u32::from(dt.second),
    )
}

fn fallback_time(path: &Path) -> NaiveDateTime {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Local>::from(modified).naive_local(),
        Err(e) => {
            warn!(
                "No modification time for {} ({e}), using current time",
                path.display()
            );
            Local::now().naive_local()
        }
    }
}
