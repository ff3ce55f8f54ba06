//! WAV container encoding and header parsing.
//!
//! Captures are stored as canonical 44-byte-header RIFF/WAVE files with a
//! single PCM `data` chunk.

use crate::models::audio_models::AudioBuffer;
use crate::models::config::AudioFormat;
use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest data chunk whose RIFF size still fits in a u32.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits_per_sample / 8
/// [32-33]  block_align = channels * bits_per_sample / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &AudioFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Patch the RIFF size (offset 4) and data size (offset 40) once the
/// final data length is known.
pub fn patch_sizes(header: &mut [u8], data_size: u32) {
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
}

/// Checked conversion of a PCM byte count to the header's u32 field.
pub fn data_size_field(byte_len: u64) -> Result<u32, CaptureError> {
    if byte_len > MAX_DATA_SIZE {
        return Err(CaptureError::EncodingFailed(format!(
            "{} bytes of audio exceed the WAV size limit",
            byte_len
        )));
    }
    Ok(byte_len as u32)
}

/// Encode a finished buffer as a complete WAV file.
///
/// Deterministic: the same buffer and format always produce the same bytes.
pub fn encode(buffer: &AudioBuffer, format: &AudioFormat) -> Result<Vec<u8>, CaptureError> {
    if buffer.is_empty() {
        return Err(CaptureError::EmptyBuffer);
    }
    format.validate().map_err(CaptureError::ConfigurationFailed)?;

    let data_size = data_size_field(buffer.byte_len() as u64)?;
    let mut out = Vec::with_capacity(WAV_HEADER_SIZE + buffer.byte_len());
    out.extend_from_slice(&generate_wav_header(format, data_size));
    out.extend_from_slice(buffer.as_bytes());
    Ok(out)
}

/// Fields read back from a WAV header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavHeader {
    pub format: AudioFormat,
    pub riff_size: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub data_size: u32,
}

impl WavHeader {
    pub fn duration_secs(&self) -> f64 {
        if self.byte_rate == 0 {
            return 0.0;
        }
        self.data_size as f64 / self.byte_rate as f64
    }
}

/// Parse a canonical 44-byte PCM WAV header.
pub fn parse_wav_header(bytes: &[u8]) -> Result<WavHeader, CaptureError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(CaptureError::EncodingFailed(format!(
            "header too short: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(CaptureError::EncodingFailed("missing RIFF/WAVE magic".into()));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(CaptureError::EncodingFailed("unexpected chunk layout".into()));
    }

    let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
    let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

    if u16_at(20) != 1 {
        return Err(CaptureError::EncodingFailed(format!(
            "unsupported format code {}",
            u16_at(20)
        )));
    }

    Ok(WavHeader {
        format: AudioFormat::new(u32_at(24), u16_at(34), u16_at(22)),
        riff_size: u32_at(4),
        byte_rate: u32_at(28),
        block_align: u16_at(32),
        data_size: u32_at(40),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_44_bytes() {
        let header = generate_wav_header(&AudioFormat::default(), 0);
        assert_eq!(header.len(), 44);
    }

    #[test]
    fn header_riff_magic() {
        let header = generate_wav_header(&AudioFormat::default(), 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn header_16khz_mono_16bit() {
        let header = generate_wav_header(&AudioFormat::default(), 9600);

        let channels = u16::from_le_bytes([header[22], header[23]]);
        assert_eq!(channels, 1);

        let sample_rate = u32::from_le_bytes([header[24], header[25], header[26], header[27]]);
        assert_eq!(sample_rate, 16000);

        let byte_rate = u32::from_le_bytes([header[28], header[29], header[30], header[31]]);
        assert_eq!(byte_rate, 32000); // 16000 * 1 * 16/8

        let block_align = u16::from_le_bytes([header[32], header[33]]);
        assert_eq!(block_align, 2);

        let data_size = u32::from_le_bytes([header[40], header[41], header[42], header[43]]);
        assert_eq!(data_size, 9600);

        let chunk_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        assert_eq!(chunk_size, 36 + 9600);
    }

    #[test]
    fn patch_sizes_updates_both_fields() {
        let mut header = generate_wav_header(&AudioFormat::default(), 0);
        patch_sizes(&mut header, 19200);

        let parsed = parse_wav_header(&header).unwrap();
        assert_eq!(parsed.data_size, 19200);
        assert_eq!(parsed.riff_size, 19200 + 36);
    }

    #[test]
    fn encode_length_matches_samples() {
        for n in [1usize, 2, 7, 2048, 16_001] {
            let buffer = AudioBuffer::from_samples(&vec![123i16; n]);
            let wav = encode(&buffer, &AudioFormat::default()).unwrap();
            assert_eq!(wav.len(), WAV_HEADER_SIZE + n * 2);

            let parsed = parse_wav_header(&wav).unwrap();
            assert_eq!(parsed.data_size as usize, n * 2);
            assert_eq!(parsed.riff_size as usize, wav.len() - 8);
        }
    }

    #[test]
    fn encode_empty_buffer_fails() {
        let err = encode(&AudioBuffer::default(), &AudioFormat::default()).unwrap_err();
        assert_eq!(err, CaptureError::EmptyBuffer);
    }

    #[test]
    fn encode_is_deterministic() {
        let buffer = AudioBuffer::from_samples(&[1, -1, 300, -300, i16::MIN, i16::MAX]);
        let a = encode(&buffer, &AudioFormat::default()).unwrap();
        let b = encode(&buffer, &AudioFormat::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[WAV_HEADER_SIZE..], buffer.as_bytes());
    }

    #[test]
    fn one_second_of_silence() {
        let buffer = AudioBuffer::from_le_bytes(vec![0u8; 32_000]);
        let wav = encode(&buffer, &AudioFormat::default()).unwrap();
        let parsed = parse_wav_header(&wav).unwrap();
        assert_eq!(parsed.data_size, 32_000);
        assert_eq!(parsed.format, AudioFormat::default());
        assert!((parsed.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_wav_header(&[0u8; 10]).is_err());
        assert!(parse_wav_header(&[0u8; 44]).is_err());
    }

    #[test]
    fn oversized_data_is_rejected() {
        assert!(data_size_field(MAX_DATA_SIZE).is_ok());
        assert!(matches!(
            data_size_field(MAX_DATA_SIZE + 1),
            Err(CaptureError::EncodingFailed(_))
        ));
    }
}
