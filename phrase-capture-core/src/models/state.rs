/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → capturing → stopped
///   ↑                   │
///   └───── start ───────┘  (a new session per capture)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Stopped { bytes_captured: u64 },
}

impl CaptureState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }
}
