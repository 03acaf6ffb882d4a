//! Registry of partially written files, removed on interrupt.

use crate::constants::PARTIAL_SUFFIX;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

/// Global registry of in-flight paths for cleanup on signal.
static IN_FLIGHT: LazyLock<Mutex<Vec<PathBuf>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// Register a path for cleanup on signal.
pub fn register_in_flight(path: &Path) {
    if let Ok(mut paths) = IN_FLIGHT.lock() {
        paths.push(path.to_path_buf());
    }
}

/// Unregister a path once it is committed or removed.
pub fn unregister_in_flight(path: &Path) {
    if let Ok(mut paths) = IN_FLIGHT.lock() {
        paths.retain(|p| p != path);
    }
}

/// Unregister several paths under one lock, so an interrupt sees either all
/// of them or none.
pub fn unregister_all(targets: &[&Path]) {
    if let Ok(mut paths) = IN_FLIGHT.lock() {
        paths.retain(|p| !targets.contains(&p.as_path()));
    }
}

/// Remove every registered path. Called on signal.
pub fn cleanup_in_flight() {
    if let Ok(mut paths) = IN_FLIGHT.lock() {
        for path in paths.drain(..) {
            let _ = fs::remove_file(path);
        }
    }
}

/// Temporary path a file is written to before being renamed into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_partial_path() {
        let path = partial_path(Path::new("/out/2024-01-15_14-30-22_deer.jpg"));
        assert_eq!(
            path,
            PathBuf::from("/out/2024-01-15_14-30-22_deer.jpg.partial")
        );
    }

    #[test]
    #[serial]
    fn test_cleanup_removes_registered_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.jpg.partial");
        File::create(&path).unwrap();

        register_in_flight(&path);
        cleanup_in_flight();

        assert!(!path.exists());
    }

    #[test]
    #[serial]
    fn test_unregistered_files_survive_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.json");
        File::create(&path).unwrap();

        register_in_flight(&path);
        unregister_in_flight(&path);
        cleanup_in_flight();

        assert!(path.exists());
    }

    #[test]
    #[serial]
    fn test_unregister_all_releases_every_path() {
        let temp_dir = TempDir::new().unwrap();
        let photo = temp_dir.path().join("photo.jpg");
        let sidecar = temp_dir.path().join("photo.json");
        let other = temp_dir.path().join("other.json.partial");
        for path in [&photo, &sidecar, &other] {
            File::create(path).unwrap();
            register_in_flight(path);
        }

        unregister_all(&[photo.as_path(), sidecar.as_path()]);
        cleanup_in_flight();

        assert!(photo.exists());
        assert!(sidecar.exists());
        assert!(!other.exists());
    }
}
