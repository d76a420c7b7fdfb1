//! Deterministic parameter-record paths and saved-network discovery.
//!
//! A session keeps every parameter record of one network under a single
//! directory: `<name>.mpk` for the rolling final state, `<name>_epoch_<n>.mpk`
//! for per-epoch snapshots. Discovery lists records in file-name order, so an
//! index is enough to select among several saved instances.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrainError};

/// Extension the record format appends to every parameter file.
pub const PARAMS_EXTENSION: &str = "mpk";

/// Record path for a network name and save policy.
///
/// The returned path carries no extension; the recorder appends its own when
/// writing.
pub fn parameter_path(dir: &Path, name: &str, epoch: Option<usize>) -> PathBuf {
    match epoch {
        Some(epoch) => dir.join(format!("{name}_epoch_{epoch}")),
        None => dir.join(name),
    }
}

/// Locate a saved parameter record inside `dir`.
///
/// Records are matched by extension and sorted by file name; `which` selects
/// among several saved instances.
pub fn find_saved_parameters(dir: &Path, which: usize) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(TrainError::NetworkDirMissing {
            path: dir.to_path_buf(),
        });
    }
    let mut records: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(PARAMS_EXTENSION))
        .collect();
    records.sort();
    tracing::debug!("Found {} parameter records in {:?}", records.len(), dir);

    if records.is_empty() {
        return Err(TrainError::NoSavedParameters {
            path: dir.to_path_buf(),
        });
    }
    let found = records.len();
    records
        .into_iter()
        .nth(which)
        .ok_or(TrainError::AmbiguousSavedParameters {
            path: dir.to_path_buf(),
            found,
            requested: which,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_parameter_path_layout() {
        let dir = Path::new("sessions/beam");
        assert_eq!(
            parameter_path(dir, "unet", None),
            PathBuf::from("sessions/beam/unet")
        );
        assert_eq!(
            parameter_path(dir, "unet", Some(7)),
            PathBuf::from("sessions/beam/unet_epoch_7")
        );
    }

    #[test]
    fn test_find_saved_parameters_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("unet_epoch_2.mpk"));
        touch(&dir.path().join("unet_epoch_1.mpk"));
        touch(&dir.path().join("notes.txt"));

        let first = find_saved_parameters(dir.path(), 0).unwrap();
        assert_eq!(first.file_name().unwrap(), "unet_epoch_1.mpk");
        let second = find_saved_parameters(dir.path(), 1).unwrap();
        assert_eq!(second.file_name().unwrap(), "unet_epoch_2.mpk");
    }

    #[test]
    fn test_find_saved_parameters_missing_dir() {
        let err = find_saved_parameters(Path::new("no/such/dir"), 0).unwrap_err();
        assert!(matches!(err, TrainError::NetworkDirMissing { .. }));
    }

    #[test]
    fn test_find_saved_parameters_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_saved_parameters(dir.path(), 0).unwrap_err();
        assert!(matches!(err, TrainError::NoSavedParameters { .. }));
    }

    #[test]
    fn test_find_saved_parameters_index_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("unet.mpk"));
        let err = find_saved_parameters(dir.path(), 3).unwrap_err();
        assert!(matches!(
            err,
            TrainError::AmbiguousSavedParameters {
                found: 1,
                requested: 3,
                ..
            }
        ));
    }
}
