//! Output file naming.

use crate::constants::{naming, sidecar};
use chrono::NaiveDateTime;

/// Build the base stem for one photo, before any collision counter.
///
/// Format: `<date>_<time>[_<species>...][_no_wildlife]`. Species are used in
/// the given order, optionally capped at `max_species`. The stem never exceeds
/// [`naming::MAX_STEM_BYTES`]; species that do not fit are shortened or left
/// out (the sidecar keeps the full list).
pub fn file_stem(
    timestamp: &NaiveDateTime,
    species: &[String],
    has_wildlife: bool,
    max_species: Option<usize>,
) -> String {
    let mut stem = format!(
        "{}{}{}",
        timestamp.format(naming::DATE_FORMAT),
        naming::SEPARATOR,
        timestamp.format(naming::TIME_FORMAT)
    );

    if !has_wildlife {
        stem.push(naming::SEPARATOR);
        stem.push_str(naming::NO_WILDLIFE_SUFFIX);
        return stem;
    }

    let limit = max_species.unwrap_or(species.len());
    for name in species.iter().take(limit) {
        let room = naming::MAX_STEM_BYTES.saturating_sub(stem.len() + 1);
        let part = truncate_component(name, room);
        if part.is_empty() {
            break;
        }
        stem.push(naming::SEPARATOR);
        stem.push_str(part);
        if part.len() < name.len() {
            break;
        }
    }
    stem
}

/// Longest prefix of `name` within `max_bytes`, cut on a char boundary and
/// without a trailing hyphen.
pub fn truncate_component(name: &str, max_bytes: usize) -> &str {
    if name.len() <= max_bytes {
        return name;
    }
    let mut end = max_bytes;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].trim_end_matches('-')
}

/// Apply a collision counter; counters below the first are the bare stem.
pub fn with_counter(stem: &str, counter: u32) -> String {
    if counter < naming::FIRST_COUNTER {
        stem.to_string()
    } else {
        format!("{stem}{}{counter}", naming::COUNTER_SEPARATOR)
    }
}

/// Photo file name for a stem, keeping the lowercased source extension.
pub fn photo_file_name(stem: &str, extension: Option<&str>) -> String {
    extension.map_or_else(|| stem.to_string(), |ext| format!("{stem}.{ext}"))
}

/// Sidecar file name for a stem.
pub fn sidecar_file_name(stem: &str) -> String {
    format!("{stem}.{}", sidecar::EXTENSION)
}
