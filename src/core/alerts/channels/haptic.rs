// Haptic channel: one vibration pattern per alert, where a motor exists.

use super::{AlertChannel, ChannelError};
use crate::core::alerts::model::{AlertChannelKind, AlertEvent};

pub trait Vibrator: Send {
    /// Alternating on/off durations in milliseconds, starting with "on"
    fn vibrate(&mut self, pattern: &[u64]) -> Result<(), ChannelError>;
}

pub struct HapticPulse {
    vibrator: Option<Box<dyn Vibrator>>,
    pattern: Vec<u64>,
}

impl HapticPulse {
    pub fn new(vibrator: Option<Box<dyn Vibrator>>, pattern: Vec<u64>) -> Self {
        Self { vibrator, pattern }
    }
}

impl AlertChannel for HapticPulse {
    fn kind(&self) -> AlertChannelKind {
        AlertChannelKind::Haptic
    }

    fn fire(&mut self, _alert: &AlertEvent) -> Result<(), ChannelError> {
        let vibrator = self
            .vibrator
            .as_mut()
            .ok_or(ChannelError::Unavailable("vibration"))?;
        vibrator.vibrate(&self.pattern)
    }
}
