use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category used when a phrase does not declare one.
pub const DEFAULT_PHRASE_CATEGORY: &str = "general";

/// Speech type assigned to new profiles.
pub const DEFAULT_SPEECH_TYPE: &str = "clear";

/// A phrase shown to the speaker. Supplied by the phrase-list source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: String,
    pub text: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_PHRASE_CATEGORY.to_string()
}

impl Phrase {
    pub fn new(id: impl Into<String>, text: impl Into<String>, category: Option<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: category.unwrap_or_else(default_category),
        }
    }

    /// Placeholder used when no phrases could be loaded.
    pub fn fallback(text: impl Into<String>) -> Self {
        Self::new("fallback", text, None)
    }
}

/// Speaker profile whose fields are copied into every recording's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub name: Option<String>,
    pub speech_type: String,
    pub speech_impairment_details: Option<String>,
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub native_language: Option<String>,
    pub device_info: String,
    pub profile_created: DateTime<Utc>,
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Anonymous User",
        }
    }

    /// Store an impairment as `"<kind>: <details>"`, or just `kind` when
    /// there are no details.
    pub fn set_impairment(&mut self, kind: &str, details: Option<&str>) {
        let details = details.map(str::trim).filter(|d| !d.is_empty());
        self.speech_impairment_details = Some(match details {
            Some(details) => format!("{}: {}", kind.trim(), details),
            None => kind.trim().to_string(),
        });
    }

    /// Split `speech_impairment_details` back into kind and details.
    pub fn impairment(&self) -> Option<(&str, Option<&str>)> {
        let raw = self.speech_impairment_details.as_deref()?;
        match raw.find(':') {
            Some(idx) if idx > 0 => {
                let details = raw[idx + 1..].trim();
                Some((raw[..idx].trim(), (!details.is_empty()).then_some(details)))
            }
            _ => Some((raw.trim(), None)),
        }
    }
}

/// `"<os> <arch>"` for the running host.
pub fn host_device_info() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
            name: None,
            speech_type: DEFAULT_SPEECH_TYPE.to_string(),
            speech_impairment_details: None,
            gender: None,
            age_group: None,
            native_language: None,
            device_info: host_device_info(),
            profile_created: Utc::now(),
            additional_info: BTreeMap::new(),
        }
    }
}
