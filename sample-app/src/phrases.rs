use std::fs;
use std::path::Path;

use phrase_capture_core::Phrase;

const EMPTY_PHRASES_TEXT: &str = "No phrases loaded. Add entries to your phrases file.";
const MISSING_PHRASES_TEXT: &str = "Could not load the phrases file. Create it with a JSON array of phrases.";

/// Load `[{id, text, category}]` from `path`.
///
/// Never fails: a missing, unreadable or empty list yields a single
/// fallback phrase.
pub fn load_phrases(path: &Path) -> Vec<Phrase> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("Failed to read phrases from {}: {}", path.display(), e);
            return vec![Phrase::fallback(MISSING_PHRASES_TEXT)];
        }
    };

    match serde_json::from_str::<Vec<Phrase>>(&json) {
        Ok(phrases) if !phrases.is_empty() => {
            log::info!("Loaded {} phrases from {}", phrases.len(), path.display());
            phrases
        }
        Ok(_) => vec![Phrase::fallback(EMPTY_PHRASES_TEXT)],
        Err(e) => {
            log::warn!("Failed to parse phrases in {}: {}", path.display(), e);
            vec![Phrase::fallback(MISSING_PHRASES_TEXT)]
        }
    }
}
