use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioBuffer, AudioSource, CaptureSessionDiagnostics};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::level_meter::{self, LevelReceiver, LevelSender};
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

/// Engine state shared with the capture callback.
struct SessionState {
    state: CaptureState,
    capture_start: Option<Instant>,
    diagnostics: CaptureSessionDiagnostics,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            capture_start: None,
            diagnostics: CaptureSessionDiagnostics::default(),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.capture_start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Buffer of one capture session. Written only from the device thread
/// until `stop` takes it.
struct FrameSink {
    buffer: AudioBuffer,
    pending: Vec<i16>,
    frame_samples: usize,
    levels: LevelSender,
}

impl FrameSink {
    fn new(frame_samples: usize, levels: LevelSender) -> Self {
        Self {
            buffer: AudioBuffer::with_capacity(frame_samples * 2 * 64),
            pending: Vec::with_capacity(frame_samples),
            frame_samples,
            levels,
        }
    }

    /// Append device samples, emitting one level per completed frame.
    fn push(&mut self, samples: &[i16], diagnostics: &mut CaptureSessionDiagnostics) {
        self.pending.extend_from_slice(samples);
        while self.pending.len() >= self.frame_samples {
            let frame: Vec<i16> = self.pending.drain(..self.frame_samples).collect();
            self.emit(&frame, diagnostics);
        }
    }

    /// Commit the trailing partial frame, if any.
    fn flush(&mut self, diagnostics: &mut CaptureSessionDiagnostics) {
        if self.pending.is_empty() {
            return;
        }
        let frame = std::mem::take(&mut self.pending);
        self.emit(&frame, diagnostics);
    }

    fn emit(&mut self, frame: &[i16], diagnostics: &mut CaptureSessionDiagnostics) {
        self.buffer.append_samples(frame);
        diagnostics.frames_captured += 1;
        diagnostics.bytes_captured += frame.len() as u64 * 2;

        let level = level_meter::frame_level(frame);
        diagnostics.levels_published += 1;
        if self.levels.publish(level) {
            diagnostics.levels_overwritten += 1;
        }
    }
}

/// Single-session microphone capture engine.
///
/// ```text
/// [CaptureProvider thread] → callback → [FrameSink: frames → AudioBuffer]
///                                                   └→ level → [LevelReceiver]
/// ```
///
/// At most one session is capturing at a time. `start` returns as soon as
/// the device streams; `stop` blocks until the device thread has exited.
pub struct CaptureEngine<P: CaptureProvider> {
    provider: P,
    config: CaptureConfiguration,
    session_state: Arc<Mutex<SessionState>>,
    sink: Option<Arc<Mutex<FrameSink>>>,
}

impl<P: CaptureProvider> CaptureEngine<P> {
    pub fn new(provider: P, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            provider,
            config,
            session_state: Arc::new(Mutex::new(SessionState::new())),
            sink: None,
        })
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.session_state.lock().state
    }

    pub fn is_capturing(&self) -> bool {
        self.state().is_capturing()
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        let mut diagnostics = self.session_state.lock().diagnostics.clone();
        diagnostics.stream_errors = self.provider.stream_errors();
        diagnostics
    }

    /// Seconds since the current (or last) session started.
    pub fn elapsed_secs(&self) -> f64 {
        self.session_state.lock().elapsed_secs()
    }

    pub fn device_info(&self) -> AudioSource {
        self.provider.device_info()
    }

    /// Start a new capture session. Transitions: idle/stopped → capturing.
    ///
    /// Returns the receiving half of the session's level channel.
    pub fn start(&mut self) -> Result<LevelReceiver, CaptureError> {
        if self.state().is_capturing() {
            return Err(CaptureError::AlreadyCapturing);
        }
        if !self.provider.is_available() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "no input device matching {:?}",
                self.config.format
            )));
        }

        let (level_tx, level_rx) = level_meter::level_channel();
        let sink = Arc::new(Mutex::new(FrameSink::new(self.config.frame_samples(), level_tx)));

        {
            let mut s = self.session_state.lock();
            s.diagnostics = CaptureSessionDiagnostics::default();
            s.capture_start = None;
        }

        let callback: AudioBufferCallback = {
            let sink = Arc::clone(&sink);
            let state = Arc::clone(&self.session_state);
            Arc::new(move |samples: &[i16]| {
                let mut s = state.lock();
                s.diagnostics.callback_count += 1;
                sink.lock().push(samples, &mut s.diagnostics);
            })
        };

        self.provider.start(&self.config.format, callback)?;

        {
            let mut s = self.session_state.lock();
            s.capture_start = Some(Instant::now());
            s.state = CaptureState::Capturing;
        }
        self.sink = Some(sink);

        log::info!(
            "Capture started on '{}' ({} Hz, {}-bit, {} ch)",
            self.provider.device_info().name,
            self.config.format.sample_rate,
            self.config.format.bits_per_sample,
            self.config.format.channels
        );
        Ok(level_rx)
    }

    /// Stop the session and return everything it captured.
    /// Transitions: capturing → stopped.
    ///
    /// A no-op returning an empty buffer when not capturing.
    pub fn stop(&mut self) -> Result<AudioBuffer, CaptureError> {
        if !self.state().is_capturing() {
            return Ok(AudioBuffer::default());
        }

        // Joins the device thread; no callback runs after this.
        if let Err(e) = self.provider.stop() {
            log::error!("Failed to stop input device cleanly: {}", e);
        }

        let buffer = match self.sink.take() {
            Some(sink) => {
                // Same lock order as the capture callback: state, then sink.
                let mut s = self.session_state.lock();
                let mut sink = sink.lock();
                sink.flush(&mut s.diagnostics);
                std::mem::take(&mut sink.buffer)
            }
            None => AudioBuffer::default(),
        };

        let elapsed = {
            let mut s = self.session_state.lock();
            s.state = CaptureState::Stopped {
                bytes_captured: buffer.byte_len() as u64,
            };
            s.elapsed_secs()
        };

        log::info!(
            "Capture stopped: {} bytes ({:.2}s of audio) after {:.2}s",
            buffer.byte_len(),
            buffer.duration_secs(&self.config.format),
            elapsed
        );
        Ok(buffer)
    }
}

impl<P: CaptureProvider> Drop for CaptureEngine<P> {
    fn drop(&mut self) {
        if self.state().is_capturing() {
            let _ = self.provider.stop();
        }
    }
}
