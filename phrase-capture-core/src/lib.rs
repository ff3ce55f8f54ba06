//! # phrase-capture-core
//!
//! Platform-agnostic core of the phrase capture pipeline.
//!
//! Captures mono 16 kHz PCM through a pluggable `CaptureProvider`, meters
//! its level, encodes it as WAV and commits each recording atomically into
//! an indexed on-disk repository.
//!
//! ## Architecture
//!
//! ```text
//! phrase-capture-core (this crate)
//! ├── traits/       ← CaptureProvider
//! ├── models/       ← AudioFormat, CaptureError, RepositoryError, RecordingMetadata, UserProfile, etc.
//! ├── processing/   ← level meter, WAV header generation and parsing
//! ├── session/      ← CaptureEngine (single-session state machine)
//! └── storage/      ← RecordingRepository, GlobalIndex, WavFileWriter, metadata sidecars
//! ```
//!
//! ## Usage
//! ```ignore
//! let mut engine = CaptureEngine::new(provider, CaptureConfiguration::default())?;
//! let levels = engine.start()?;
//! // ... poll levels.try_latest() ...
//! let buffer = engine.stop()?;
//!
//! let repo = RecordingRepository::open(RepositoryConfig::new("recordings"))?;
//! let staged = repo.new_recording_path(&metadata.recording_id)?;
//! write_wav_file(&staged, &buffer, &engine.config().format)?;
//! let result = repo.commit(metadata, &staged)?;
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioBuffer, AudioSource, CaptureSessionDiagnostics};
pub use models::config::{AudioFormat, CaptureConfiguration, RepositoryConfig};
pub use models::error::{CaptureError, CommitStage, RepositoryError};
pub use models::profile::{Phrase, UserProfile};
pub use models::recording_metadata::{AudioProperties, CommitResult, RecordingMetadata};
pub use models::state::CaptureState;
pub use processing::level_meter::{LevelReceiver, LevelSender};
pub use processing::wav_format::{encode, parse_wav_header, WavHeader};
pub use session::capture::CaptureEngine;
pub use storage::index::GlobalIndex;
pub use storage::repository::{ConsistencyReport, RecordingRepository};
pub use storage::wav_writer::{write_wav_file, WavFileWriter};
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider};
