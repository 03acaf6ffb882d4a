//! Progress bar utilities for batch runs.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar over the photos in a batch.
pub fn create_photo_progress(total_photos: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_photos == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_photos as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} photos ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

/// Show the photo currently being processed.
pub fn set_current(pb: Option<&ProgressBar>, name: &str) {
    if let Some(pb) = pb {
        pb.set_message(name.to_string());
    }
}

/// Increment a progress bar.
pub fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_or_empty_has_no_bar() {
        assert!(create_photo_progress(10, false).is_none());
        assert!(create_photo_progress(0, true).is_none());
    }

    #[test]
    fn test_enabled_bar_tracks_length() {
        let pb = create_photo_progress(3, true);
        assert_eq!(pb.as_ref().and_then(ProgressBar::length), Some(3));
        inc_progress(pb.as_ref());
        assert_eq!(pb.as_ref().map(ProgressBar::position), Some(1));
        finish_progress(pb, "done");
    }
}
