//! Destination directories and collision-safe artifact reservation.

use super::in_flight::{partial_path, register_in_flight, unregister_all, unregister_in_flight};
use super::naming::{photo_file_name, sidecar_file_name, truncate_component, with_counter};
use crate::config::Placement;
use crate::constants::naming;
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory an artifact lands in for the given placement mode.
pub fn destination_dir(
    output_root: &Path,
    placement: Placement,
    timestamp: &NaiveDateTime,
    species: &[String],
) -> PathBuf {
    match placement {
        Placement::Flat => output_root.to_path_buf(),
        Placement::ByDate => output_root.join(timestamp.format(naming::DATE_FORMAT).to_string()),
        Placement::BySpecies => output_root.join(species.first().map_or(
            naming::NO_WILDLIFE_DIR,
            |name| truncate_component(name, naming::MAX_STEM_BYTES),
        )),
    }
}

/// Exclusive claim on one artifact stem in a destination directory.
///
/// The stem is claimed by creating its sidecar file with `create_new`, so two
/// claims can never hold the same name. Until [`commit`](Self::commit) is
/// called, dropping the reservation removes everything it wrote.
#[derive(Debug)]
pub struct ArtifactReservation {
    stem: String,
    photo_path: PathBuf,
    sidecar_path: PathBuf,
    photo_written: bool,
    moved_from: Option<PathBuf>,
    committed: bool,
}

impl ArtifactReservation {
    /// Claim the first free stem in `dir`: `base`, then `base-2`, `base-3`...
    ///
    /// A stem is free when neither its sidecar nor its photo exists.
    pub fn reserve(dir: &Path, base: &str, extension: Option<&str>) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| Error::ArtifactWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;

        for counter in (naming::FIRST_COUNTER - 1)..=naming::MAX_COUNTER {
            let stem = with_counter(base, counter);
            let photo_path = dir.join(photo_file_name(&stem, extension));
            let sidecar_path = dir.join(sidecar_file_name(&stem));

            if photo_path.exists() {
                continue;
            }

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&sidecar_path)
            {
                Ok(_) => {
                    register_in_flight(&sidecar_path);
                    if counter >= naming::FIRST_COUNTER {
                        debug!("Stem {base} taken, using {stem}");
                    }
                    return Ok(Self {
                        stem,
                        photo_path,
                        sidecar_path,
                        photo_written: false,
                        moved_from: None,
                        committed: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(Error::ArtifactWrite {
                        path: sidecar_path,
                        source: e,
                    });
                }
            }
        }

        Err(Error::ArtifactWrite {
            path: dir.join(base),
            source: std::io::Error::other(format!(
                "no free name after {} collisions",
                naming::MAX_COUNTER
            )),
        })
    }

    /// Claimed stem, counter included.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Final photo path.
    pub fn photo_path(&self) -> &Path {
        &self.photo_path
    }

    /// Final sidecar path.
    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    /// Place the source photo through a `.partial` file.
    ///
    /// With `move_original`, the partial is a hard link to the source when
    /// both live on one filesystem (a copy otherwise), and the source is only
    /// removed once [`commit`](Self::commit) succeeds.
    pub fn write_photo(&mut self, source: &Path, move_original: bool) -> Result<()> {
        let partial = partial_path(&self.photo_path);
        register_in_flight(&partial);
        register_in_flight(&self.photo_path);

        let staged = if move_original {
            fs::hard_link(source, &partial).or_else(|e| {
                debug!("Hard link failed ({e}), copying {}", source.display());
                fs::copy(source, &partial).map(|_| ())
            })
        } else {
            fs::copy(source, &partial).map(|_| ())
        };
        let written = staged.and_then(|()| fs::rename(&partial, &self.photo_path));
        unregister_in_flight(&partial);

        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            unregister_in_flight(&self.photo_path);
            return Err(Error::ArtifactWrite {
                path: self.photo_path.clone(),
                source: e,
            });
        }

        self.photo_written = true;
        if move_original {
            self.moved_from = Some(source.to_path_buf());
        }
        Ok(())
    }

    /// Write the sidecar through a `.partial` file and rename it over the
    /// reservation. This rename is the commit point of the artifact pair.
    pub fn commit(mut self, sidecar: &[u8]) -> Result<PathBuf> {
        let partial = partial_path(&self.sidecar_path);
        register_in_flight(&partial);

        let written =
            fs::write(&partial, sidecar).and_then(|()| fs::rename(&partial, &self.sidecar_path));
        unregister_in_flight(&partial);

        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(Error::ArtifactWrite {
                path: self.sidecar_path.clone(),
                source: e,
            });
        }

        unregister_all(&[self.sidecar_path.as_path(), self.photo_path.as_path()]);
        self.committed = true;

        if let Some(source) = self.moved_from.take() {
            // The pair is committed; a source we cannot remove is only a leftover
            if let Err(e) = fs::remove_file(&source) {
                warn!("Could not remove moved original {}: {e}", source.display());
            }
        }
        Ok(self.sidecar_path.clone())
    }
}

impl Drop for ArtifactReservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if self.photo_written {
            let _ = fs::remove_file(&self.photo_path);
        }
        let _ = fs::remove_file(&self.sidecar_path);
        unregister_all(&[self.sidecar_path.as_path(), self.photo_path.as_path()]);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::output::cleanup_in_flight;
    use serial_test::serial;
    use tempfile::TempDir;

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-01-15 14:30:22", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_destination_dir_modes() {
        let root = Path::new("/out");
        let species = vec!["deer".to_string(), "bird".to_string()];
        assert_eq!(
            destination_dir(root, Placement::Flat, &ts(), &species),
            PathBuf::from("/out")
        );
        assert_eq!(
            destination_dir(root, Placement::ByDate, &ts(), &species),
            PathBuf::from("/out/2024-01-15")
        );
        assert_eq!(
            destination_dir(root, Placement::BySpecies, &ts(), &species),
            PathBuf::from("/out/deer")
        );
        assert_eq!(
            destination_dir(root, Placement::BySpecies, &ts(), &[]),
            PathBuf::from("/out/no_wildlife")
        );
    }

    #[test]
    #[serial]
    fn test_second_reservation_gets_counter() {
        let dir = TempDir::new().unwrap();
        let first = ArtifactReservation::reserve(dir.path(), "stem", Some("jpg")).unwrap();
        let second = ArtifactReservation::reserve(dir.path(), "stem", Some("jpg")).unwrap();
        assert_eq!(first.stem(), "stem");
        assert_eq!(second.stem(), "stem-2");
        first.commit(b"{}").unwrap();
        second.commit(b"{}").unwrap();
        assert!(dir.path().join("stem.json").exists());
        assert!(dir.path().join("stem-2.json").exists());
    }

    #[test]
    #[serial]
    fn test_existing_photo_blocks_stem() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stem.jpg"), b"prior").unwrap();

        let reservation = ArtifactReservation::reserve(dir.path(), "stem", Some("jpg")).unwrap();
        assert_eq!(reservation.stem(), "stem-2");
        assert_eq!(fs::read(dir.path().join("stem.jpg")).unwrap(), b"prior");
    }

    #[test]
    #[serial]
    fn test_dropped_reservation_cleans_up() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jpg");
        fs::write(&source, b"pixels").unwrap();
        let out = dir.path().join("out");

        let mut reservation = ArtifactReservation::reserve(&out, "stem", Some("jpg")).unwrap();
        reservation.write_photo(&source, false).unwrap();
        assert!(out.join("stem.jpg").exists());
        drop(reservation);

        assert!(!out.join("stem.jpg").exists());
        assert!(!out.join("stem.json").exists());
    }

    #[test]
    #[serial]
    fn test_commit_writes_pair() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jpg");
        fs::write(&source, b"pixels").unwrap();
        let out = dir.path().join("out");

        let mut reservation = ArtifactReservation::reserve(&out, "stem", Some("jpg")).unwrap();
        reservation.write_photo(&source, false).unwrap();
        let sidecar = reservation.commit(br#"{"ok":true}"#).unwrap();

        assert_eq!(fs::read(out.join("stem.jpg")).unwrap(), b"pixels");
        assert_eq!(fs::read(&sidecar).unwrap(), br#"{"ok":true}"#);
        assert!(!out.join("stem.json.partial").exists());
    }

    #[test]
    #[serial]
    fn test_move_removes_source_only_after_commit() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jpg");
        fs::write(&source, b"pixels").unwrap();
        let out = dir.path().join("out");

        let mut reservation = ArtifactReservation::reserve(&out, "stem", Some("jpg")).unwrap();
        reservation.write_photo(&source, true).unwrap();
        assert!(source.exists());
        assert!(out.join("stem.jpg").exists());

        reservation.commit(b"{}").unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(out.join("stem.jpg")).unwrap(), b"pixels");
    }

    #[test]
    #[serial]
    fn test_failed_move_keeps_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jpg");
        fs::write(&source, b"pixels").unwrap();
        let out = dir.path().join("out");

        let mut reservation = ArtifactReservation::reserve(&out, "stem", Some("jpg")).unwrap();
        reservation.write_photo(&source, true).unwrap();
        drop(reservation);

        assert_eq!(fs::read(&source).unwrap(), b"pixels");
        assert!(!out.join("stem.jpg").exists());
        assert!(!out.join("stem.json").exists());
    }

    #[test]
    #[serial]
    fn test_placed_photo_is_in_flight_until_commit() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jpg");
        fs::write(&source, b"pixels").unwrap();
        let out = dir.path().join("out");

        let mut reservation = ArtifactReservation::reserve(&out, "stem", Some("jpg")).unwrap();
        reservation.write_photo(&source, false).unwrap();

        // An interrupt here removes both halves of the pair
        cleanup_in_flight();
        assert!(!out.join("stem.jpg").exists());
        assert!(!out.join("stem.json").exists());
        drop(reservation);
    }

    #[test]
    #[serial]
    fn test_committed_pair_survives_interrupt() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jpg");
        fs::write(&source, b"pixels").unwrap();
        let out = dir.path().join("out");

        let mut reservation = ArtifactReservation::reserve(&out, "stem", Some("jpg")).unwrap();
        reservation.write_photo(&source, false).unwrap();
        reservation.commit(b"{}").unwrap();

        cleanup_in_flight();
        assert!(out.join("stem.jpg").exists());
        assert!(out.join("stem.json").exists());
    }
}
