//! # phrase-capture-cpal
//!
//! Cross-platform microphone backend for phrase-capture, built on cpal.
//!
//! Provides:
//! - `CpalMicCapture`: microphone capture on a dedicated stream thread
//! - `DeviceEnumerator`: input device listing with format support flags
//!
//! ## Usage
//! ```ignore
//! use phrase_capture_core::{AudioFormat, CaptureConfiguration, CaptureEngine};
//! use phrase_capture_cpal::CpalMicCapture;
//!
//! let mic = CpalMicCapture::default_device(AudioFormat::default());
//! let mut engine = CaptureEngine::new(mic, CaptureConfiguration::default())?;
//! ```

pub mod device_enumerator;
pub mod mic_capture;

pub use device_enumerator::DeviceEnumerator;
pub use mic_capture::CpalMicCapture;
