use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::models::config::RepositoryConfig;
use crate::models::error::{CommitStage, RepositoryError};
use crate::models::recording_metadata::{audio_file_name, CommitResult, RecordingMetadata};
use crate::processing::wav_format::{self, WAV_HEADER_SIZE};
use crate::storage::index::GlobalIndex;
use crate::storage::metadata::{read_metadata, sync_dir, write_metadata, METADATA_FILE_NAME};
use crate::storage::wav_writer::sha256_file;

/// How the audio reached the recording directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Moved,
    Copied,
}

/// Steps inside `commit` where unit tests can force an I/O failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaultPoint {
    DirectorySync,
    AudioPlacement,
    Checksum,
    Metadata,
    Index,
}

/// Result of `RecordingRepository::check_consistency`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Recording directories with no index entry.
    pub orphan_directories: Vec<String>,
    /// Index entries whose directory, audio or sidecar is missing.
    pub dangling_entries: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.orphan_directories.is_empty() && self.dangling_entries.is_empty()
    }
}

/// Durable per-recording storage plus the global index.
///
/// ```text
/// <base>/
/// ├── recordings_index.json
/// ├── temp/<id>.wav              ← staged captures
/// └── <id>/
///     ├── <id>.wav
///     └── metadata.json
/// ```
///
/// `commit` is all-or-nothing: either the recording directory, its two
/// files and the index entry all exist, or none of them do and the staged
/// source is left in place. Commits are serialized by an internal lock.
pub struct RecordingRepository {
    config: RepositoryConfig,
    write_lock: Mutex<()>,
    #[cfg(test)]
    fault: Mutex<Option<FaultPoint>>,
}

impl RecordingRepository {
    /// Open (creating if needed) the repository rooted at `config.base_dir`.
    pub fn open(config: RepositoryConfig) -> Result<Self, RepositoryError> {
        fs::create_dir_all(&config.base_dir)
            .map_err(|e| RepositoryError::io("create repository", &config.base_dir, e))?;
        log::debug!("Opened recording repository at {}", config.base_dir.display());
        Ok(Self {
            config,
            write_lock: Mutex::new(()),
            #[cfg(test)]
            fault: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.index_path()
    }

    pub fn recording_dir(&self, recording_id: &str) -> PathBuf {
        self.config.base_dir.join(recording_id)
    }

    /// Staging path for a capture that has not been committed yet.
    pub fn new_recording_path(&self, recording_id: &str) -> Result<PathBuf, RepositoryError> {
        self.validate_id(recording_id)?;
        let staging = self.config.staging_dir();
        fs::create_dir_all(&staging).map_err(|e| RepositoryError::io("create staging directory", &staging, e))?;
        Ok(staging.join(audio_file_name(recording_id)))
    }

    /// Every committed recording, in commit order.
    pub fn load_index(&self) -> Result<GlobalIndex, RepositoryError> {
        GlobalIndex::load(&self.index_path())
    }

    /// Read the sidecar of a committed recording.
    pub fn load_metadata(&self, recording_id: &str) -> Result<RecordingMetadata, RepositoryError> {
        self.validate_id(recording_id)?;
        read_metadata(&self.recording_dir(recording_id))
    }

    /// Commit the staged WAV file at `source` as a new recording.
    ///
    /// On failure the returned `CommitFailure` names the stage that was not
    /// reached; the index is unchanged, no recording directory is left
    /// behind and `source` still holds the audio.
    pub fn commit(&self, mut metadata: RecordingMetadata, source: &Path) -> Result<CommitResult, RepositoryError> {
        let _guard = self.write_lock.lock();

        let recording_id = metadata.recording_id.clone();
        self.validate_id(&recording_id)?;

        let index_path = self.index_path();
        let mut index = GlobalIndex::load(&index_path)?;
        if index.contains(&recording_id) {
            return Err(RepositoryError::DuplicateRecording(recording_id));
        }

        let fail = |stage: CommitStage, source: io::Error| {
            log::error!("Commit of {} failed at {}: {}", recording_id, stage, source);
            RepositoryError::CommitFailure {
                recording_id: recording_id.clone(),
                stage,
                source,
            }
        };

        // Staged
        let header = read_staged_header(source).map_err(|e| fail(CommitStage::Staged, e))?;
        let duration_secs = header.duration_secs();

        // DirectoryCreated
        let recording_dir = self.recording_dir(&recording_id);
        fs::create_dir(&recording_dir).map_err(|e| fail(CommitStage::DirectoryCreated, e))?;
        let synced = self
            .inject(FaultPoint::DirectorySync)
            .and_then(|()| sync_dir(&self.config.base_dir));
        if let Err(e) = synced {
            self.rollback(&recording_dir, None, source);
            return Err(fail(CommitStage::DirectoryCreated, e));
        }
        log::debug!("Created {}", recording_dir.display());

        // AudioPlaced
        let file_name = audio_file_name(&recording_id);
        let audio_path = recording_dir.join(&file_name);
        let placed = self
            .inject(FaultPoint::AudioPlacement)
            .and_then(|()| place_audio(source, &audio_path));
        let placement = match placed {
            Ok(placement) => placement,
            Err(e) => {
                self.rollback(&recording_dir, None, source);
                return Err(fail(CommitStage::AudioPlaced, e));
            }
        };
        let checksum = match self.inject(FaultPoint::Checksum).and_then(|()| sha256_file(&audio_path)) {
            Ok(checksum) => checksum,
            Err(e) => {
                self.rollback(&recording_dir, Some((placement, &audio_path)), source);
                return Err(fail(CommitStage::AudioPlaced, e));
            }
        };
        log::debug!("Placed audio at {} ({:?})", audio_path.display(), placement);

        // MetadataWritten
        metadata.recording_file = file_name;
        let written = self
            .inject(FaultPoint::Metadata)
            .and_then(|()| write_metadata(&metadata, &recording_dir));
        let metadata_path = match written {
            Ok(path) => path,
            Err(e) => {
                self.rollback(&recording_dir, Some((placement, &audio_path)), source);
                return Err(fail(CommitStage::MetadataWritten, e));
            }
        };

        // IndexUpdated
        index.push(metadata.clone());
        if let Err(e) = self.inject(FaultPoint::Index).and_then(|()| index.save(&index_path)) {
            self.rollback(&recording_dir, Some((placement, &audio_path)), source);
            return Err(fail(CommitStage::IndexUpdated, e));
        }

        // Committed
        if placement == Placement::Copied {
            if let Err(e) = fs::remove_file(source) {
                log::warn!("Committed {} but could not remove staged copy {}: {}", recording_id, source.display(), e);
            }
        }

        log::info!(
            "Committed recording {} ({:.2}s, index now {} entries)",
            recording_id,
            duration_secs,
            index.len()
        );

        Ok(CommitResult {
            metadata,
            recording_dir,
            audio_path,
            metadata_path,
            checksum,
            duration_secs,
            index_len: index.len(),
        })
    }

    /// Compare the index against the recording directories on disk.
    pub fn check_consistency(&self) -> Result<ConsistencyReport, RepositoryError> {
        let index = self.load_index()?;
        let mut report = ConsistencyReport::default();

        let base = &self.config.base_dir;
        let entries = fs::read_dir(base).map_err(|e| RepositoryError::io("list repository", base, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| RepositoryError::io("list repository", base, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| RepositoryError::io("inspect", entry.path(), e))?
                .is_dir();
            if !is_dir {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == self.config.staging_dir_name {
                continue;
            }
            if !index.contains(&name) {
                report.orphan_directories.push(name);
            }
        }
        report.orphan_directories.sort();

        for entry in index.iter() {
            let dir = self.recording_dir(&entry.recording_id);
            let complete = dir.join(&entry.recording_file).is_file() && dir.join(METADATA_FILE_NAME).is_file();
            if !complete {
                report.dangling_entries.push(entry.recording_id.clone());
            }
        }

        if !report.is_consistent() {
            log::warn!(
                "Repository {} is inconsistent: {} orphan directories, {} dangling entries",
                base.display(),
                report.orphan_directories.len(),
                report.dangling_entries.len()
            );
        }
        Ok(report)
    }

    /// Delete abandoned staged captures. Returns the number removed.
    pub fn purge_staging(&self) -> Result<usize, RepositoryError> {
        let _guard = self.write_lock.lock();

        let staging = self.config.staging_dir();
        let entries = match fs::read_dir(&staging) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(RepositoryError::io("list staging directory", &staging, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry
                .map_err(|e| RepositoryError::io("list staging directory", &staging, e))?
                .path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| RepositoryError::io("remove staged file", &path, e))?;
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!("Purged {} staged captures from {}", removed, staging.display());
        }
        Ok(removed)
    }

    /// Recording IDs become directory names; they must be a single plain
    /// path component that cannot collide with repository bookkeeping.
    fn validate_id(&self, recording_id: &str) -> Result<(), RepositoryError> {
        let valid = !recording_id.is_empty()
            && recording_id != "."
            && recording_id != ".."
            && !recording_id.contains(['/', '\\', '\0'])
            && recording_id != self.config.staging_dir_name
            && recording_id != self.config.index_file_name;
        if valid {
            Ok(())
        } else {
            Err(RepositoryError::InvalidRecordingId(recording_id.to_string()))
        }
    }

    #[cfg(test)]
    fn inject(&self, point: FaultPoint) -> io::Result<()> {
        if *self.fault.lock() == Some(point) {
            return Err(io::Error::other(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[inline(always)]
    fn inject(&self, _point: FaultPoint) -> io::Result<()> {
        Ok(())
    }

    /// Undo a partial commit. Moved audio goes back to `source` first; if
    /// that fails the directory is kept so the audio is not lost.
    fn rollback(&self, recording_dir: &Path, placed: Option<(Placement, &Path)>, source: &Path) {
        if let Some((Placement::Moved, audio_path)) = placed {
            if let Err(e) = fs::rename(audio_path, source) {
                log::error!(
                    "Rollback could not restore {} to {}: {}; leaving {} in place",
                    audio_path.display(),
                    source.display(),
                    e,
                    recording_dir.display()
                );
                return;
            }
        }
        match fs::remove_dir_all(recording_dir) {
            Ok(()) => log::warn!("Rolled back {}", recording_dir.display()),
            Err(e) => log::error!("Rollback could not remove {}: {}", recording_dir.display(), e),
        }
    }
}

/// Parse the staged file's header and check the file holds exactly the
/// PCM payload the header declares.
fn read_staged_header(source: &Path) -> io::Result<wav_format::WavHeader> {
    let mut file = File::open(source)?;
    let file_meta = file.metadata()?;
    if !file_meta.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "staged audio is not a file"));
    }
    let mut bytes = [0u8; WAV_HEADER_SIZE];
    file.read_exact(&mut bytes)?;
    let header = wav_format::parse_wav_header(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let expected = WAV_HEADER_SIZE as u64 + u64::from(header.data_size);
    if file_meta.len() != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "staged audio is {} bytes but its header declares {}",
                file_meta.len(),
                expected
            ),
        ));
    }
    Ok(header)
}

/// Rename within the volume; fall back to a synced copy when the rename
/// cannot cross devices. The source is kept after a copy.
fn place_audio(source: &Path, dest: &Path) -> io::Result<Placement> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(Placement::Moved),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            log::debug!("Rename of {} failed ({}), copying instead", source.display(), e);
            fs::copy(source, dest)?;
            File::open(dest)?.sync_all()?;
            Ok(Placement::Copied)
        }
    }
}
