mod commands;
mod phrases;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use phrase_capture_core::{CaptureConfiguration, RecordingRepository, RepositoryConfig};

use commands::ProfileArgs;

#[derive(Parser)]
#[command(name = "phrase-recorder")]
#[command(about = "Record spoken phrases into an indexed WAV dataset")]
struct Cli {
    /// Repository root (defaults to "Phrase Recordings" in the documents directory)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List input devices
    Devices,

    /// Record one phrase and commit it
    Record {
        /// JSON array of {id, text, category}
        #[arg(long, default_value = "phrases.json")]
        phrases: PathBuf,

        /// Zero-based index into the phrase list
        #[arg(long, default_value_t = 0)]
        phrase_index: usize,

        /// Capture length in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,

        /// Input device name (see `devices`)
        #[arg(long)]
        device: Option<String>,

        /// Profile file, created on first use
        #[arg(long)]
        profile: Option<PathBuf>,

        #[arg(long)]
        name: Option<String>,

        /// Speech type, e.g. "clear" or "impaired"
        #[arg(long)]
        speech_type: Option<String>,

        #[arg(long)]
        impairment_type: Option<String>,

        #[arg(long, requires = "impairment_type")]
        impairment_details: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        age_group: Option<String>,

        #[arg(long)]
        native_language: Option<String>,
    },

    /// Print the recording index
    Index {
        /// Print the raw JSON document
        #[arg(long)]
        json: bool,
    },

    /// Report orphan directories and dangling index entries
    Check {
        /// Also delete abandoned staged captures
        #[arg(long)]
        purge_staging: bool,
    },
}

fn default_base_dir() -> PathBuf {
    dirs_next::document_dir()
        .map(|dir| dir.join("Phrase Recordings"))
        .unwrap_or_else(|| PathBuf::from("recordings"))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let base_dir = cli.base_dir.unwrap_or_else(default_base_dir);

    match cli.command {
        Command::Devices => commands::list_capture_devices(&CaptureConfiguration::default().format),
        Command::Record {
            phrases: phrases_file,
            phrase_index,
            seconds,
            device,
            profile,
            name,
            speech_type,
            impairment_type,
            impairment_details,
            gender,
            age_group,
            native_language,
        } => {
            if !(seconds.is_finite() && seconds > 0.0) {
                bail!("--seconds must be positive");
            }

            let phrases = phrases::load_phrases(&phrases_file);
            let Some(phrase) = phrases.get(phrase_index) else {
                bail!("phrase index {} out of range (0..{})", phrase_index, phrases.len());
            };

            let profile = commands::resolve_profile(
                profile.as_deref(),
                ProfileArgs {
                    name,
                    speech_type,
                    impairment_type,
                    impairment_details,
                    gender,
                    age_group,
                    native_language,
                },
            )?;
            log::info!("Recording as {} ({})", profile.display_name(), profile.user_id);

            let repo = RecordingRepository::open(RepositoryConfig::new(&base_dir))?;
            let config = CaptureConfiguration {
                device_name: device,
                ..CaptureConfiguration::default()
            };

            let result =
                commands::record_phrase(&repo, &profile, phrase, config, Duration::from_secs_f64(seconds))?;
            println!(
                "Saved {} ({:.2}s, sha256 {}), {} recordings in index",
                result.audio_path.display(),
                result.duration_secs,
                result.checksum,
                result.index_len
            );
            Ok(())
        }
        Command::Index { json } => {
            let repo = RecordingRepository::open(RepositoryConfig::new(&base_dir))?;
            commands::show_index(&repo, json)
        }
        Command::Check { purge_staging } => {
            let repo = RecordingRepository::open(RepositoryConfig::new(&base_dir))?;
            commands::check_repository(&repo, purge_staging)
        }
    }
}
