//! Input device enumeration and format negotiation via cpal.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, StreamConfig, SupportedStreamConfigRange};

use phrase_capture_core::models::audio_models::AudioSource;
use phrase_capture_core::models::config::AudioFormat;
use phrase_capture_core::models::error::CaptureError;

/// Stream configuration chosen for a device.
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
}

/// Audio device enumerator over the default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input devices, flagging which accept `format`.
    pub fn list_capture_devices(&self, format: &AudioFormat) -> Result<Vec<AudioSource>, CaptureError> {
        let default_name = self.default_capture_device_name();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to list input devices: {}", e)))?;

        let mut sources = Vec::new();
        for device in devices {
            let name = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    log::debug!("Skipping input device without a name: {}", e);
                    continue;
                }
            };
            let supports_format = negotiate_input_config(&device, format).is_ok();
            sources.push(AudioSource {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                supports_format,
            });
        }
        Ok(sources)
    }

    /// Name of the system default input device, if any.
    pub fn default_capture_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the default device, or the input device named exactly `name`.
pub fn find_input_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    match name {
        Some(name) => {
            let mut devices = host
                .input_devices()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to list input devices: {}", e)))?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceUnavailable(format!("input device '{}' not found", name)))
        }
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into())),
    }
}

/// Pick a stream config delivering `format.sample_rate` without resampling.
///
/// Prefers the exact channel count and i16 samples; accepts f32 and
/// multi-channel configs, which the capture thread converts and downmixes.
pub fn negotiate_input_config(device: &cpal::Device, format: &AudioFormat) -> Result<InputConfig, CaptureError> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to query input configs: {}", e)))?;

    let rate = cpal::SampleRate(format.sample_rate);
    let best = ranges
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .filter(|range| matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .min_by_key(|range| config_rank(range, format.channels));

    match best {
        Some(range) => {
            let sample_format = range.sample_format();
            Ok(InputConfig {
                config: range.with_sample_rate(rate).into(),
                sample_format,
            })
        }
        None => Err(CaptureError::DeviceUnavailable(format!(
            "device does not support {} Hz input",
            format.sample_rate
        ))),
    }
}

/// Lower is better: exact channel count first, then i16 over f32.
fn config_rank(range: &SupportedStreamConfigRange, channels: u16) -> (bool, bool, u16) {
    (
        range.channels() != channels,
        range.sample_format() != SampleFormat::I16,
        range.channels(),
    )
}
