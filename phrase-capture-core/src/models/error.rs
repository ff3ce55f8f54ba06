use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from the capture engine and the WAV encoder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("input device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("a capture session is already active")]
    AlreadyCapturing,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("audio buffer is empty")]
    EmptyBuffer,

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Commit state machine.
///
/// ```text
/// Staged → DirectoryCreated → AudioPlaced → MetadataWritten → IndexUpdated → Committed
/// ```
///
/// In a `CommitFailure`, `stage` is the state the commit failed to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommitStage {
    Staged,
    DirectoryCreated,
    AudioPlaced,
    MetadataWritten,
    IndexUpdated,
    Committed,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Staged => "staged",
            Self::DirectoryCreated => "directory-created",
            Self::AudioPlaced => "audio-placed",
            Self::MetadataWritten => "metadata-written",
            Self::IndexUpdated => "index-updated",
            Self::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// Errors from the recording repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("commit of recording {recording_id} failed at stage {stage}: {source}")]
    CommitFailure {
        recording_id: String,
        stage: CommitStage,
        #[source]
        source: io::Error,
    },

    #[error("recording {0} is already committed")]
    DuplicateRecording(String),

    #[error("invalid recording id {0:?}")]
    InvalidRecordingId(String),

    #[error("index {} is corrupt: {source}", .path.display())]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("metadata {} is invalid: {source}", .path.display())]
    InvalidMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RepositoryError {
    /// The commit stage for `CommitFailure`, None otherwise.
    pub fn stage(&self) -> Option<CommitStage> {
        match self {
            Self::CommitFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
