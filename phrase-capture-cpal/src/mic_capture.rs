//! cpal microphone capture provider.
//!
//! Opens an input stream at the requested sample rate and delivers signed
//! 16-bit mono samples via the `AudioBufferCallback`. The stream lives on a
//! dedicated thread for its whole lifetime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;

use phrase_capture_core::models::audio_models::AudioSource;
use phrase_capture_core::models::config::AudioFormat;
use phrase_capture_core::models::error::CaptureError;
use phrase_capture_core::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

use crate::device_enumerator::{find_input_device, negotiate_input_config, InputConfig};

/// Microphone capture through the platform's default cpal host.
pub struct CpalMicCapture {
    device_name: Option<String>,
    format: AudioFormat,
    running: Arc<AtomicBool>,
    supports_format: AtomicBool,
    stream_errors: Arc<AtomicU64>,
    stop_tx: Option<Sender<()>>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalMicCapture {
    /// Capture from the system default input device.
    pub fn default_device(format: AudioFormat) -> Self {
        Self::build(None, format)
    }

    /// Capture from the input device whose name is exactly `name`.
    pub fn with_device(name: impl Into<String>, format: AudioFormat) -> Self {
        Self::build(Some(name.into()), format)
    }

    fn build(device_name: Option<String>, format: AudioFormat) -> Self {
        Self {
            device_name,
            format,
            running: Arc::new(AtomicBool::new(false)),
            supports_format: AtomicBool::new(false),
            stream_errors: Arc::new(AtomicU64::new(0)),
            stop_tx: None,
            capture_handle: Mutex::new(None),
        }
    }

    fn probe(&self) -> bool {
        let host = cpal::default_host();
        let supported = find_input_device(&host, self.device_name.as_deref())
            .and_then(|device| negotiate_input_config(&device, &self.format))
            .is_ok();
        self.supports_format.store(supported, Ordering::Relaxed);
        supported
    }
}

impl CaptureProvider for CpalMicCapture {
    fn is_available(&self) -> bool {
        self.probe()
    }

    fn start(&mut self, format: &AudioFormat, callback: AudioBufferCallback) -> Result<(), CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyCapturing);
        }

        self.format = *format;
        self.stream_errors.store(0, Ordering::SeqCst);

        let (ready_tx, ready_rx) = bounded::<Result<String, CaptureError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let device_name = self.device_name.clone();
        let format = *format;
        let running = Arc::clone(&self.running);
        let stream_errors = Arc::clone(&self.stream_errors);

        self.running.store(true, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), &format, callback, stream_errors) {
                    Ok((stream, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        running.store(false, Ordering::SeqCst);
                        return;
                    }
                };

                // Blocks until `stop` sends or drops the sender.
                let _ = stop_rx.recv();
                if let Err(e) = stream.pause() {
                    log::debug!("Failed to pause input stream: {}", e);
                }
                drop(stream);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::ConfigurationFailed(format!("failed to spawn mic thread: {}", e))
            })?;

        let startup = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(CaptureError::DeviceUnavailable("capture thread exited".into())));

        match startup {
            Ok(name) => {
                log::debug!("Input stream open on '{}'", name);
                self.supports_format.store(true, Ordering::Relaxed);
                self.stop_tx = Some(stop_tx);
                *self.capture_handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                let _ = handle.join();
                self.supports_format.store(false, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.capture_handle.lock().take() {
            handle
                .join()
                .map_err(|_| CaptureError::ConfigurationFailed("mic capture thread panicked".into()))?;
        }
        Ok(())
    }

    fn device_info(&self) -> AudioSource {
        let name = self
            .device_name
            .clone()
            .unwrap_or_else(|| "Default Microphone".into());
        AudioSource {
            id: self.device_name.clone().unwrap_or_else(|| "default-mic".into()),
            name,
            is_default: self.device_name.is_none(),
            supports_format: self.supports_format.load(Ordering::Relaxed),
        }
    }

    fn stream_errors(&self) -> u64 {
        self.stream_errors.load(Ordering::Relaxed)
    }
}

impl Drop for CpalMicCapture {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Open and start the input stream. Runs on the capture thread; cpal
/// streams are not `Send` on every platform.
fn open_stream(
    device_name: Option<&str>,
    format: &AudioFormat,
    callback: AudioBufferCallback,
    stream_errors: Arc<AtomicU64>,
) -> Result<(cpal::Stream, String), CaptureError> {
    let host = cpal::default_host();
    let device = find_input_device(&host, device_name)?;
    let name = device.name().unwrap_or_else(|_| "Unknown Device".into());
    let InputConfig { config, sample_format } = negotiate_input_config(&device, format)?;

    log::debug!(
        "Mic config for '{}': format={:?} sample_rate={}Hz channels={}",
        name,
        sample_format,
        config.sample_rate.0,
        config.channels
    );

    let err_fn = move |err: cpal::StreamError| {
        stream_errors.fetch_add(1, Ordering::Relaxed);
        log::warn!("Input stream error: {}", err);
    };

    let stream = build_stream(&device, &config, sample_format, callback, err_fn)
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to open '{}': {}", name, e)))?;
    stream
        .play()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to start '{}': {}", name, e)))?;

    Ok((stream, name))
}

fn build_stream<E>(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    callback: AudioBufferCallback,
    err_fn: E,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    E: FnMut(cpal::StreamError) + Send + 'static,
{
    let channels = usize::from(config.channels.max(1));
    match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if channels == 1 {
                    callback(data);
                } else {
                    callback(&downmix(data, channels, i32::from));
                }
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                callback(&downmix(data, channels, f32_to_i32));
            },
            err_fn,
            None,
        ),
        other => Err(cpal::BuildStreamError::BackendSpecific {
            err: cpal::BackendSpecificError {
                description: format!("unsupported sample format: {:?}", other),
            },
        }),
    }
}

fn f32_to_i32(sample: f32) -> i32 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i32
}

/// Average each interleaved frame into one i16 sample.
pub(crate) fn downmix<T, F>(data: &[T], channels: usize, convert: F) -> Vec<i16>
where
    T: Copy,
    F: Fn(T) -> i32,
{
    let channels = channels.max(1);
    data.chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().copied().map(&convert).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_frames() {
        let mono = downmix(&[100i16, 300, -50, -150], 2, i32::from);
        assert_eq!(mono, vec![200, -100]);
    }

    #[test]
    fn downmix_mono_is_identity() {
        assert_eq!(downmix(&[1i16, -2, 3], 1, i32::from), vec![1, -2, 3]);
    }

    #[test]
    fn float_samples_are_scaled_and_clamped() {
        assert_eq!(downmix(&[1.0f32, -1.0, 0.0, 2.0], 1, f32_to_i32), vec![32767, -32767, 0, 32767]);
    }

    #[test]
    fn device_info_before_start() {
        let mic = CpalMicCapture::with_device("USB Mic", AudioFormat::default());
        let info = mic.device_info();
        assert_eq!(info.name, "USB Mic");
        assert!(!info.is_default);
        assert!(!info.supports_format);
        assert_eq!(mic.stream_errors(), 0);
    }

    #[test]
    fn stop_without_start_is_ok() {
        let mut mic = CpalMicCapture::default_device(AudioFormat::default());
        assert!(mic.stop().is_ok());
        assert!(mic.device_info().is_default);
    }
}
