use super::config::AudioFormat;

/// An input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    /// Whether the device accepts the canonical 16 kHz / 16-bit / mono format.
    pub supports_format: bool,
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSessionDiagnostics {
    pub callback_count: u64,
    pub frames_captured: u64,
    pub bytes_captured: u64,
    pub levels_published: u64,
    /// Levels replaced before the consumer read them.
    pub levels_overwritten: u64,
    pub stream_errors: u64,
}

/// Captured PCM: signed 16-bit little-endian mono samples.
///
/// Only the capture engine appends to a buffer; once returned from
/// `stop` it is read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
}

impl AudioBuffer {
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut buffer = Self::with_capacity(samples.len() * 2);
        buffer.append_samples(samples);
        buffer
    }

    /// Wraps raw little-endian PCM bytes. A trailing odd byte is dropped.
    pub fn from_le_bytes(mut bytes: Vec<u8>) -> Self {
        if bytes.len() % 2 != 0 {
            bytes.pop();
        }
        Self { bytes }
    }

    pub(crate) fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
        }
    }

    pub(crate) fn append_samples(&mut self, samples: &[i16]) {
        self.bytes.reserve(samples.len() * 2);
        for sample in samples {
            self.bytes.extend_from_slice(&sample.to_le_bytes());
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn sample_count(&self) -> usize {
        self.bytes.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    pub fn duration_secs(&self, format: &AudioFormat) -> f64 {
        format.duration_secs(self.bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_stored_little_endian() {
        let buffer = AudioBuffer::from_samples(&[1, -2, i16::MAX]);
        assert_eq!(buffer.as_bytes(), &[0x01, 0x00, 0xFE, 0xFF, 0xFF, 0x7F]);
        assert_eq!(buffer.sample_count(), 3);
        assert_eq!(buffer.samples().collect::<Vec<_>>(), vec![1, -2, i16::MAX]);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        let buffer = AudioBuffer::from_le_bytes(vec![0x10, 0x00, 0x20]);
        assert_eq!(buffer.byte_len(), 2);
        assert_eq!(buffer.samples().collect::<Vec<_>>(), vec![16]);
    }

    #[test]
    fn duration_uses_format() {
        let buffer = AudioBuffer::from_samples(&vec![0i16; 8000]);
        assert_eq!(buffer.duration_secs(&AudioFormat::default()), 0.5);
    }
}
