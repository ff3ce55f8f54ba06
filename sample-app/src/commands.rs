use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use phrase_capture_core::models::recording_metadata::new_recording_id;
use phrase_capture_core::{
    write_wav_file, AudioFormat, CaptureConfiguration, CaptureEngine, CommitResult, Phrase, RecordingMetadata,
    RecordingRepository, UserProfile,
};
use phrase_capture_cpal::{CpalMicCapture, DeviceEnumerator};

const LEVEL_BAR_WIDTH: usize = 40;

/// Speaker details from the command line.
pub struct ProfileArgs {
    pub name: Option<String>,
    pub speech_type: Option<String>,
    pub impairment_type: Option<String>,
    pub impairment_details: Option<String>,
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub native_language: Option<String>,
}

pub fn list_capture_devices(format: &AudioFormat) -> Result<()> {
    let devices = DeviceEnumerator::new()
        .list_capture_devices(format)
        .context("failed to enumerate input devices")?;
    if devices.is_empty() {
        println!("No input devices found.");
        return Ok(());
    }
    for device in devices {
        println!(
            "{} {}{}",
            if device.is_default { "*" } else { " " },
            device.name,
            if device.supports_format { "" } else { "  (no 16 kHz input)" }
        );
    }
    Ok(())
}

/// Load the stored profile, or build one from `args` and store it.
///
/// Flags override the stored values.
pub fn resolve_profile(path: Option<&Path>, args: ProfileArgs) -> Result<UserProfile> {
    let mut profile = match path {
        Some(path) if path.exists() => {
            let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("invalid profile {}", path.display()))?
        }
        _ => UserProfile::default(),
    };

    if args.name.is_some() {
        profile.name = args.name;
    }
    if let Some(speech_type) = args.speech_type {
        profile.speech_type = speech_type;
    }
    if let Some(kind) = args.impairment_type.as_deref() {
        profile.set_impairment(kind, args.impairment_details.as_deref());
    }
    if args.gender.is_some() {
        profile.gender = args.gender;
    }
    if args.age_group.is_some() {
        profile.age_group = args.age_group;
    }
    if args.native_language.is_some() {
        profile.native_language = args.native_language;
    }

    if let Some(path) = path {
        let json = serde_json::to_string_pretty(&profile)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(profile)
}

/// Capture `phrase` for `duration`, then encode, stage and commit it.
pub fn record_phrase(
    repo: &RecordingRepository,
    profile: &UserProfile,
    phrase: &Phrase,
    config: CaptureConfiguration,
    duration: Duration,
) -> Result<CommitResult> {
    let format = config.format;
    let mic = match config.device_name.as_deref() {
        Some(name) => CpalMicCapture::with_device(name, format),
        None => CpalMicCapture::default_device(format),
    };
    let mut engine = CaptureEngine::new(mic, config)?;

    println!("[{}] {}", phrase.category, phrase.text);
    println!("Recording for {:.1}s...", duration.as_secs_f64());

    let levels = engine.start()?;
    let started = Instant::now();
    while started.elapsed() < duration {
        if let Some(level) = levels.recv_timeout(Duration::from_millis(100)) {
            print_level(level);
        }
    }
    let buffer = engine.stop()?;
    println!();

    let diagnostics = engine.diagnostics();
    log::debug!("Capture diagnostics: {:?}", diagnostics);
    if diagnostics.stream_errors > 0 {
        log::warn!("{} stream errors during capture", diagnostics.stream_errors);
    }
    if buffer.is_empty() {
        bail!("no audio captured from '{}'", engine.device_info().name);
    }

    let recording_id = new_recording_id();
    let staged = repo.new_recording_path(&recording_id)?;
    let checksum = write_wav_file(&staged, &buffer, &format)?;
    log::debug!("Staged {} (sha256 {})", staged.display(), checksum);

    let metadata = RecordingMetadata::new(&recording_id, profile, phrase, &format)
        .with_additional_info("userName", profile.display_name());
    let result = repo
        .commit(metadata, &staged)
        .with_context(|| format!("staged audio kept at {}", staged.display()))?;
    Ok(result)
}

pub fn show_index(repo: &RecordingRepository, json: bool) -> Result<()> {
    let index = repo.load_index()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }
    if index.is_empty() {
        println!("No recordings in {}", repo.base_dir().display());
        return Ok(());
    }
    for entry in index.iter() {
        println!(
            "{}  {}  [{}] {}",
            entry.timestamp, entry.recording_id, entry.phrase_category, entry.phrase_text
        );
    }
    println!("{} recordings", index.len());
    Ok(())
}

pub fn check_repository(repo: &RecordingRepository, purge_staging: bool) -> Result<()> {
    let report = repo.check_consistency()?;
    for name in &report.orphan_directories {
        println!("orphan directory: {}", name);
    }
    for id in &report.dangling_entries {
        println!("dangling index entry: {}", id);
    }
    if report.is_consistent() {
        println!("Repository is consistent.");
    }
    if purge_staging {
        let removed = repo.purge_staging()?;
        println!("Removed {} staged captures.", removed);
    }
    Ok(())
}

fn print_level(level: f32) {
    let filled = ((level / 100.0) * LEVEL_BAR_WIDTH as f32).round() as usize;
    let filled = filled.min(LEVEL_BAR_WIDTH);
    print!(
        "\r[{}{}] {:5.1}",
        "#".repeat(filled),
        " ".repeat(LEVEL_BAR_WIDTH - filled),
        level
    );
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_flags() -> ProfileArgs {
        ProfileArgs {
            name: None,
            speech_type: None,
            impairment_type: None,
            impairment_details: None,
            gender: None,
            age_group: None,
            native_language: None,
        }
    }

    #[test]
    fn profile_is_created_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        let created = resolve_profile(
            Some(&path),
            ProfileArgs {
                name: Some("Sam".into()),
                impairment_type: Some("Dysarthria".into()),
                impairment_details: Some("mild".into()),
                ..no_flags()
            },
        )
        .unwrap();
        assert_eq!(created.speech_impairment_details.as_deref(), Some("Dysarthria: mild"));

        let reused = resolve_profile(Some(&path), no_flags()).unwrap();
        assert_eq!(reused.user_id, created.user_id);
        assert_eq!(reused.display_name(), "Sam");
    }

    #[test]
    fn profile_without_path_is_fresh() {
        let a = resolve_profile(None, no_flags()).unwrap();
        let b = resolve_profile(None, no_flags()).unwrap();
        assert_ne!(a.user_id, b.user_id);
        assert_eq!(a.speech_type, "clear");
    }
}
