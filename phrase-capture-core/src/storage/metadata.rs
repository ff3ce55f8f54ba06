use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::models::error::RepositoryError;
use crate::models::recording_metadata::RecordingMetadata;

/// File name of the per-recording sidecar.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Write recording metadata as a JSON sidecar file.
///
/// Creates `{recording_dir}/metadata.json` and returns its path.
pub fn write_metadata(metadata: &RecordingMetadata, recording_dir: &Path) -> io::Result<PathBuf> {
    let metadata_path = recording_dir.join(METADATA_FILE_NAME);
    let json = serde_json::to_vec_pretty(metadata)?;
    write_atomic(&metadata_path, &json)?;
    Ok(metadata_path)
}

/// Read recording metadata from the sidecar in `recording_dir`.
pub fn read_metadata(recording_dir: &Path) -> Result<RecordingMetadata, RepositoryError> {
    let metadata_path = recording_dir.join(METADATA_FILE_NAME);
    let json = fs::read(&metadata_path)
        .map_err(|e| RepositoryError::io("read metadata", &metadata_path, e))?;
    serde_json::from_slice(&json).map_err(|source| RepositoryError::InvalidMetadata {
        path: metadata_path,
        source,
    })
}

/// Path of the temporary file used while replacing `path`.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `bytes` via a synced temp file in the same
/// directory and a rename. Readers see either the old or the new content.
///
/// An `Err` means `path` still holds its previous content. Once the rename
/// has landed the write is reported as done, even if flushing the parent
/// directory fails.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    write_atomic_with(path, bytes, sync_dir)
}

fn write_atomic_with<F>(path: &Path, bytes: &[u8], sync_parent: F) -> io::Result<()>
where
    F: Fn(&Path) -> io::Result<()>,
{
    let tmp_path = temp_path_for(path);
    if let Err(e) = write_synced(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = sync_parent(parent) {
            log::warn!("Replaced {} but could not flush {}: {}", path.display(), parent.display(), e);
        }
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Flush a directory entry update (rename/create) to disk.
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::AudioFormat;
    use crate::models::profile::{Phrase, UserProfile};

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path_for(Path::new("/a/recordings_index.json")),
            PathBuf::from("/a/recordings_index.json.tmp")
        );
    }

    #[test]
    fn sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = RecordingMetadata::new(
            "rec-9",
            &UserProfile::default(),
            &Phrase::new("p", "hello there", None),
            &AudioFormat::default(),
        );

        let path = write_metadata(&metadata, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("metadata.json"));
        assert!(!dir.path().join("metadata.json.tmp").exists());
        assert_eq!(read_metadata(dir.path()).unwrap(), metadata);
    }

    #[test]
    fn invalid_sidecar_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(METADATA_FILE_NAME), b"{ not json").unwrap();
        assert!(matches!(
            read_metadata(dir.path()),
            Err(RepositoryError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_atomic(&path, b"[1]").unwrap();
        write_atomic(&path, b"[1,2]").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"[1,2]");
    }

    #[test]
    fn directory_flush_failure_after_rename_is_not_a_failed_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_atomic(&path, b"old").unwrap();

        let result = write_atomic_with(&path, b"new", |_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "directory flush refused"))
        });
        assert!(result.is_ok());
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn failed_atomic_write_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_atomic(&path, b"old").unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(temp_path_for(&path)).unwrap();
        assert!(write_atomic(&path, b"new").is_err());
        assert_eq!(fs::read(&path).unwrap(), b"old");
    }
}
