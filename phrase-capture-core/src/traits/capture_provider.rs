use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::config::AudioFormat;
use crate::models::error::CaptureError;

/// Callback invoked when the device delivers samples.
///
/// Samples are signed 16-bit mono in the format passed to `start`. Chunk
/// sizes are whatever the device produces; the engine re-frames them.
pub type AudioBufferCallback = Arc<dyn Fn(&[i16]) + Send + Sync + 'static>;

/// Interface for platform-specific input devices.
///
/// Implemented by:
/// - `CpalMicCapture` (phrase-capture-cpal)
/// - scripted providers in tests
pub trait CaptureProvider: Send {
    /// Whether a device matching the canonical format can be opened.
    fn is_available(&self) -> bool;

    /// Open the device in `format` and start delivering samples via `callback`.
    ///
    /// Must return as soon as the device is streaming; samples are delivered
    /// on a dedicated thread. Fails with `DeviceUnavailable` when no
    /// matching device exists or it cannot be opened.
    fn start(&mut self, format: &AudioFormat, callback: AudioBufferCallback) -> Result<(), CaptureError>;

    /// Stop capturing and release the device.
    ///
    /// Blocks until the capture thread has exited; `callback` is never
    /// invoked after this returns.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Information about the device backing this provider.
    fn device_info(&self) -> AudioSource;

    /// Stream errors reported by the device since the last `start`.
    fn stream_errors(&self) -> u64 {
        0
    }
}
