use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::AudioFormat;
use super::profile::{Phrase, UserProfile};

/// Timestamp layout stored in metadata, e.g. `20250314_093005`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Generate a new random recording ID (UUID v4).
pub fn new_recording_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current local time in `TIMESTAMP_FORMAT`.
pub fn recording_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Audio file name used for a committed recording.
pub fn audio_file_name(recording_id: &str) -> String {
    format!("{}.wav", recording_id)
}

/// Format of the committed audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioProperties {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl From<&AudioFormat> for AudioProperties {
    fn from(format: &AudioFormat) -> Self {
        Self {
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            channels: format.channels,
        }
    }
}

/// Metadata persisted as `metadata.json` next to each recording and as one
/// entry of the global index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub recording_id: String,
    pub user_id: String,
    pub phrase_id: String,
    pub phrase_text: String,
    pub phrase_category: String,
    pub recording_file: String,
    pub timestamp: String,
    pub speech_type: String,
    pub speech_impairment_details: Option<String>,
    pub device_info: String,
    pub audio_properties: AudioProperties,
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
}

impl RecordingMetadata {
    /// Creates metadata for a capture of `phrase` spoken by `profile`.
    ///
    /// `recording_file` starts as `<recording_id>.wav`; the repository
    /// rewrites it when the commit path is fixed.
    pub fn new(recording_id: &str, profile: &UserProfile, phrase: &Phrase, format: &AudioFormat) -> Self {
        Self {
            recording_id: recording_id.to_string(),
            user_id: profile.user_id.clone(),
            phrase_id: phrase.id.clone(),
            phrase_text: phrase.text.clone(),
            phrase_category: phrase.category.clone(),
            recording_file: audio_file_name(recording_id),
            timestamp: recording_timestamp(),
            speech_type: profile.speech_type.clone(),
            speech_impairment_details: profile.speech_impairment_details.clone(),
            device_info: profile.device_info.clone(),
            audio_properties: AudioProperties::from(format),
            additional_info: BTreeMap::new(),
        }
    }

    pub fn with_additional_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitResult {
    pub metadata: RecordingMetadata,
    pub recording_dir: PathBuf,
    pub audio_path: PathBuf,
    pub metadata_path: PathBuf,
    /// SHA-256 hex digest of the committed audio file.
    pub checksum: String,
    pub duration_secs: f64,
    /// Number of entries in the index after this commit.
    pub index_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> RecordingMetadata {
        let profile = UserProfile {
            user_id: "user-1".into(),
            speech_type: "impaired".into(),
            speech_impairment_details: Some("Stuttering: mild".into()),
            device_info: "linux x86_64".into(),
            ..UserProfile::default()
        };
        let phrase = Phrase::new("p1", "Open the door", Some("commands".into()));
        RecordingMetadata::new("rec-1", &profile, &phrase, &AudioFormat::default())
            .with_additional_info("session", "morning")
    }

    #[test]
    fn new_copies_profile_and_phrase() {
        let metadata = sample_metadata();
        assert_eq!(metadata.recording_file, "rec-1.wav");
        assert_eq!(metadata.user_id, "user-1");
        assert_eq!(metadata.phrase_category, "commands");
        assert_eq!(metadata.audio_properties.sample_rate, 16_000);
        assert_eq!(metadata.timestamp.len(), 15);
        assert_eq!(metadata.additional_info.get("session").map(String::as_str), Some("morning"));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(sample_metadata()).unwrap();
        assert_eq!(json["recordingId"], "rec-1");
        assert_eq!(json["phraseText"], "Open the door");
        assert_eq!(json["speechImpairmentDetails"], "Stuttering: mild");
        assert_eq!(json["audioProperties"]["bitsPerSample"], 16);
        assert_eq!(json["audioProperties"]["channels"], 1);
        assert_eq!(json["additionalInfo"]["session"], "morning");
    }

    #[test]
    fn missing_impairment_details_serializes_as_null() {
        let mut metadata = sample_metadata();
        metadata.speech_impairment_details = None;
        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json["speechImpairmentDetails"].is_null());

        let back: RecordingMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn recording_ids_are_unique() {
        assert_ne!(new_recording_id(), new_recording_id());
    }
}
