use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::error::RepositoryError;
use crate::models::recording_metadata::RecordingMetadata;
use crate::storage::metadata::write_atomic;

/// Every committed recording, in commit order.
///
/// Persisted as a single JSON array at the repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalIndex {
    entries: Vec<RecordingMetadata>,
}

impl GlobalIndex {
    /// Read the index at `path`; an absent file is an empty index.
    ///
    /// A present but unparseable file is `CorruptIndex` and is left untouched.
    pub fn load(path: &Path) -> Result<Self, RepositoryError> {
        let json = match fs::read(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(RepositoryError::io("read index", path, e)),
        };
        serde_json::from_slice(&json).map_err(|source| RepositoryError::CorruptIndex {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rewrite the whole document atomically.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)
    }

    pub fn push(&mut self, metadata: RecordingMetadata) {
        self.entries.push(metadata);
    }

    pub fn contains(&self, recording_id: &str) -> bool {
        self.get(recording_id).is_some()
    }

    pub fn get(&self, recording_id: &str) -> Option<&RecordingMetadata> {
        self.entries.iter().find(|m| m.recording_id == recording_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordingMetadata> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<RecordingMetadata>> for GlobalIndex {
    fn from(entries: Vec<RecordingMetadata>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::AudioFormat;
    use crate::models::profile::{Phrase, UserProfile};

    fn entry(id: &str) -> RecordingMetadata {
        RecordingMetadata::new(id, &UserProfile::default(), &Phrase::new("p", "text", None), &AudioFormat::default())
    }

    #[test]
    fn missing_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = GlobalIndex::load(&dir.path().join("recordings_index.json")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn save_and_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings_index.json");

        let mut index = GlobalIndex::default();
        index.push(entry("b"));
        index.push(entry("a"));
        index.save(&path).unwrap();

        let loaded = GlobalIndex::load(&path).unwrap();
        let ids: Vec<_> = loaded.iter().map(|m| m.recording_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(loaded.contains("a"));
        assert!(!loaded.contains("c"));
    }

    #[test]
    fn index_is_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings_index.json");
        GlobalIndex::from(vec![entry("x")]).save(&path).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["recordingId"], "x");
    }

    #[test]
    fn corrupt_index_is_reported_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings_index.json");
        fs::write(&path, b"[{\"recordingId\": ").unwrap();

        let err = GlobalIndex::load(&path).unwrap_err();
        assert!(matches!(err, RepositoryError::CorruptIndex { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"[{\"recordingId\": ");
    }

    #[test]
    fn wrong_schema_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings_index.json");
        fs::write(&path, b"{\"recordings\": []}").unwrap();
        assert!(matches!(
            GlobalIndex::load(&path),
            Err(RepositoryError::CorruptIndex { .. })
        ));
    }
}
