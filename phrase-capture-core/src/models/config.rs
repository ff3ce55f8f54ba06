use std::path::PathBuf;

/// PCM format shared by the capture engine and the WAV encoder.
///
/// Samples are always signed, little-endian integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Sample rate in Hz (default: 16000).
    pub sample_rate: u32,

    /// Bits per sample (default: 16). Only 16 is accepted by `validate`.
    pub bits_per_sample: u16,

    /// Channel count (default: 1).
    pub channels: u16,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self {
            sample_rate,
            bits_per_sample,
            channels,
        }
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Bytes per sample frame (all channels).
    pub fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Duration in seconds represented by `byte_len` bytes of PCM in this format.
    pub fn duration_secs(&self, byte_len: u64) -> f64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        byte_len as f64 / rate as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.bits_per_sample != 16 {
            return Err(format!("unsupported bit depth: {}", self.bits_per_sample));
        }
        if self.channels != 1 {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        Ok(())
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(16_000, 16, 1)
    }
}

/// Configuration for a capture engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    pub format: AudioFormat,

    /// Size of one capture frame in bytes (default: 4096).
    pub frame_bytes: usize,

    /// Input device name, or None for the system default.
    pub device_name: Option<String>,
}

impl CaptureConfiguration {
    /// Number of samples in one capture frame.
    pub fn frame_samples(&self) -> usize {
        self.frame_bytes / self.format.bytes_per_sample().max(1) as usize
    }

    pub fn validate(&self) -> Result<(), String> {
        self.format.validate()?;
        let block = self.format.block_align() as usize;
        if self.frame_bytes == 0 || self.frame_bytes % block != 0 {
            return Err(format!(
                "frame size {} is not a positive multiple of the block size {}",
                self.frame_bytes, block
            ));
        }
        Ok(())
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            frame_bytes: 4096,
            device_name: None,
        }
    }
}

/// On-disk layout of a recording repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Root directory holding recording directories and the index.
    pub base_dir: PathBuf,

    /// File name of the global index inside `base_dir`.
    pub index_file_name: String,

    /// Name of the staging directory inside `base_dir`.
    pub staging_dir_name: String,
}

impl RepositoryConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(&self.index_file_name)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.base_dir.join(&self.staging_dir_name)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("recordings"),
            index_file_name: "recordings_index.json".into(),
            staging_dir_name: "temp".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_16khz_16bit_mono() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 16_000);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.channels, 1);
        assert_eq!(format.byte_rate(), 32_000);
        assert_eq!(format.block_align(), 2);
    }

    #[test]
    fn duration_of_one_second_of_bytes() {
        let format = AudioFormat::default();
        assert_eq!(format.duration_secs(32_000), 1.0);
        assert_eq!(format.duration_secs(16_000), 0.5);
    }

    #[test]
    fn validate_rejects_unsupported_formats() {
        assert!(AudioFormat::new(0, 16, 1).validate().is_err());
        assert!(AudioFormat::new(16_000, 24, 1).validate().is_err());
        assert!(AudioFormat::new(16_000, 16, 2).validate().is_err());
        assert!(AudioFormat::default().validate().is_ok());
    }

    #[test]
    fn frame_size_must_align_to_samples() {
        let mut config = CaptureConfiguration::default();
        assert_eq!(config.frame_samples(), 2048);
        assert!(config.validate().is_ok());

        config.frame_bytes = 4095;
        assert!(config.validate().is_err());

        config.frame_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn repository_paths() {
        let config = RepositoryConfig::new("/data/rec");
        assert_eq!(config.index_path(), PathBuf::from("/data/rec/recordings_index.json"));
        assert_eq!(config.staging_dir(), PathBuf::from("/data/rec/temp"));
    }
}
