use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioBuffer;
use crate::models::config::AudioFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format;

/// Streaming WAV file writer.
///
/// Writes a placeholder header on `open`, appends samples as they arrive
/// and patches the RIFF and data sizes on `close`. The finished file is
/// byte-identical to `wav_format::encode` of the same samples.
///
/// ```text
/// [44-byte WAV header]
/// [raw 16-bit PCM data...]
/// ```
pub struct WavFileWriter {
    file_path: PathBuf,
    format: AudioFormat,
    file: Option<File>,
    data_bytes: u64,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf, format: AudioFormat) -> Self {
        Self {
            file_path,
            format,
            file: None,
            data_bytes: 0,
        }
    }

    /// Create the file and write the initial 44-byte WAV header.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }
        self.format.validate().map_err(CaptureError::ConfigurationFailed)?;

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
        }

        let mut file = File::create(&self.file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create file: {}", e)))?;

        // Data size placeholder, patched on close.
        let header = wav_format::generate_wav_header(&self.format, 0);
        file.write_all(&header)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;

        self.file = Some(file);
        self.data_bytes = 0;
        Ok(())
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), CaptureError> {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        self.write_raw(&bytes)
    }

    pub fn write_buffer(&mut self, buffer: &AudioBuffer) -> Result<(), CaptureError> {
        self.write_raw(buffer.as_bytes())
    }

    /// Finalize the file: patch header sizes, sync, compute SHA-256 checksum.
    pub fn close(&mut self) -> Result<String, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        if self.data_bytes == 0 {
            drop(file);
            let _ = fs::remove_file(&self.file_path);
            return Err(CaptureError::EmptyBuffer);
        }

        let data_size = wav_format::data_size_field(self.data_bytes)?;
        let mut header = wav_format::generate_wav_header(&self.format, 0);
        wav_format::patch_sizes(&mut header, data_size);

        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(&header))
            .and_then(|()| file.sync_all())
            .map_err(|e| CaptureError::StorageError(format!("failed to finalize header: {}", e)))?;
        drop(file);

        sha256_file(&self.file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))
    }

    /// PCM bytes written so far (excluding the header).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.data_bytes += data.len() as u64;
        Ok(())
    }
}

/// Encode `buffer` into a WAV file at `path`, returning its SHA-256.
pub fn write_wav_file(path: &Path, buffer: &AudioBuffer, format: &AudioFormat) -> Result<String, CaptureError> {
    if buffer.is_empty() {
        return Err(CaptureError::EmptyBuffer);
    }
    let mut writer = WavFileWriter::new(path.to_path_buf(), *format);
    writer.open()?;
    writer.write_buffer(buffer)?;
    writer.close()
}

/// Compute the SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        hasher.update(&chunk[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
