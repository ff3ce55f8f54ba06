//! Frame level metering and the latest-value-wins level channel.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

/// Highest level reported by `frame_level`.
pub const MAX_LEVEL: f32 = 100.0;

/// Mean absolute amplitude of `samples`, scaled from 0..32767 to 0..100.
///
/// Returns 0 for an empty frame. Full-scale negative samples are clamped
/// so the result never exceeds `MAX_LEVEL`.
pub fn frame_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.iter().map(|&s| (s as i32).unsigned_abs() as u64).sum();
    let mean = sum as f64 / samples.len() as f64;
    ((mean / i16::MAX as f64) * MAX_LEVEL as f64).min(MAX_LEVEL as f64) as f32
}

/// Create a single-slot level channel.
pub fn level_channel() -> (LevelSender, LevelReceiver) {
    let (tx, rx) = bounded(1);
    (
        LevelSender {
            tx,
            evict: rx.clone(),
        },
        LevelReceiver { rx },
    )
}

/// Producer half, owned by the capture thread. Never blocks.
#[derive(Clone)]
pub struct LevelSender {
    tx: Sender<f32>,
    evict: Receiver<f32>,
}

impl LevelSender {
    /// Publish `level`, replacing any value the consumer has not read yet.
    ///
    /// Returns true when an unread value was overwritten.
    pub fn publish(&self, level: f32) -> bool {
        match self.tx.try_send(level) {
            Ok(()) => false,
            Err(TrySendError::Full(level)) => {
                let _ = self.evict.try_recv();
                let _ = self.tx.try_send(level);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer half, handed to the controller by `CaptureEngine::start`.
pub struct LevelReceiver {
    rx: Receiver<f32>,
}

impl LevelReceiver {
    /// The most recent unread level, if any.
    pub fn try_latest(&self) -> Option<f32> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next level.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<f32> {
        match self.rx.recv_timeout(timeout) {
            Ok(level) => Some(level),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn silence_is_zero() {
        assert_eq!(frame_level(&[0; 2048]), 0.0);
        assert_eq!(frame_level(&[]), 0.0);
    }

    #[test]
    fn alternating_full_scale_approaches_100() {
        let samples: Vec<i16> = (0..2048)
            .map(|i| if i % 2 == 0 { i16::MAX } else { i16::MIN })
            .collect();
        assert_relative_eq!(frame_level(&samples), 100.0, epsilon = 0.01);
    }

    #[test]
    fn level_is_linear_in_amplitude() {
        let half: Vec<i16> = vec![16_384; 100];
        assert_relative_eq!(frame_level(&half), 50.0, epsilon = 0.01);

        let mixed = [1000i16, -1000, 1000, -1000];
        assert_relative_eq!(frame_level(&mixed), 1000.0 / 327.67, epsilon = 0.001);
    }

    #[test]
    fn unread_level_is_overwritten() {
        let (tx, rx) = level_channel();
        assert!(!tx.publish(10.0));
        assert!(tx.publish(20.0));
        assert!(tx.publish(30.0));
        assert_eq!(rx.try_latest(), Some(30.0));
        assert_eq!(rx.try_latest(), None);
    }

    #[test]
    fn publish_after_consume_does_not_overwrite() {
        let (tx, rx) = level_channel();
        tx.publish(5.0);
        assert_eq!(rx.recv_timeout(Duration::from_millis(10)), Some(5.0));
        assert!(!tx.publish(6.0));
        assert_eq!(rx.try_latest(), Some(6.0));
    }

    #[test]
    fn publish_without_consumer_never_blocks() {
        let (tx, rx) = level_channel();
        drop(rx);
        for i in 0..1000 {
            tx.publish(i as f32);
        }
    }
}
