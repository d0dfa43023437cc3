// Tone channel: an alternating square-wave beep sequence.
//
// The audio output is opened lazily on first use and reused afterwards. Once
// released it stays inert until the engine is rebuilt.

use std::time::Duration;

use log::debug;

use super::{AlertChannel, ChannelError};
use crate::core::alerts::model::{AlertChannelKind, AlertEvent, ToneSettings};
use crate::core::preference::SoundPreference;

/// One beep, positioned relative to the start of the sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beep {
    pub frequency_hz: f32,
    pub start: Duration,
    pub duration: Duration,
    pub gain: f32,
}

/// Lay out the beep sequence: even beeps at the base pitch, odd beeps raised.
pub fn beep_schedule(settings: &ToneSettings) -> Vec<Beep> {
    let beep = Duration::from_millis(settings.beep_ms);
    let step = Duration::from_millis(settings.beep_ms + settings.gap_ms);
    (0..settings.beeps)
        .map(|i| {
            let frequency_hz = if i % 2 == 0 {
                settings.base_frequency_hz
            } else {
                settings.base_frequency_hz + settings.alternate_step_hz
            };
            Beep {
                frequency_hz,
                start: step * i,
                duration: beep,
                gain: settings.gain,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Running,
    Suspended,
}

/// An opened audio output able to play a beep sequence without blocking.
pub trait ToneOutput: Send {
    fn state(&self) -> AudioState {
        AudioState::Running
    }

    fn resume(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn play(&mut self, beeps: &[Beep]) -> Result<(), ChannelError>;

    /// Stop accepting sequences and give the device back
    fn close(&mut self) {}
}

/// Opens tone outputs on demand.
pub trait AudioDevice: Send {
    fn open(&mut self) -> Result<Box<dyn ToneOutput>, ChannelError>;
}

pub struct ToneSequence {
    device: Option<Box<dyn AudioDevice>>,
    output: Option<Box<dyn ToneOutput>>,
    preference: SoundPreference,
    settings: ToneSettings,
    released: bool,
}

impl ToneSequence {
    pub fn new(
        device: Option<Box<dyn AudioDevice>>,
        preference: SoundPreference,
        settings: ToneSettings,
    ) -> Self {
        Self {
            device,
            output: None,
            preference,
            settings,
            released: false,
        }
    }

    pub fn preference(&self) -> &SoundPreference {
        &self.preference
    }

    /// Open the output ahead of time, e.g. from an operator gesture.
    pub fn prime(&mut self) {
        if let Err(e) = self.ensure_output() {
            debug!("Audio output not primed: {}", e);
        }
    }

    /// Play the sequence regardless of the preference (used by the test alarm).
    pub fn play(&mut self) -> Result<(), ChannelError> {
        let beeps = beep_schedule(&self.settings);
        let output = self.ensure_output()?;

        if output.state() == AudioState::Suspended {
            output.resume()?;
        }

        output.play(&beeps)
    }

    /// Close the output; further plays fail with `Released`.
    pub fn release(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.close();
        }
        self.released = true;
    }

    fn ensure_output(&mut self) -> Result<&mut Box<dyn ToneOutput>, ChannelError> {
        if self.released {
            return Err(ChannelError::Released);
        }
        if self.output.is_none() {
            let device = self
                .device
                .as_mut()
                .ok_or(ChannelError::Unavailable("audio output"))?;
            self.output = Some(device.open()?);
        }
        self.output
            .as_mut()
            .ok_or(ChannelError::Unavailable("audio output"))
    }
}

impl AlertChannel for ToneSequence {
    fn kind(&self) -> AlertChannelKind {
        AlertChannelKind::Tone
    }

    fn fire(&mut self, _alert: &AlertEvent) -> Result<(), ChannelError> {
        if !self.preference.is_armed() {
            return Err(ChannelError::Disarmed);
        }
        self.play()
    }
}

#[cfg(feature = "audio")]
pub use self::rodio_backend::RodioDevice;

#[cfg(feature = "audio")]
mod rodio_backend {
    use std::sync::mpsc;
    use std::thread;

    use log::{debug, warn};
    use rodio::source::SquareWave;
    use rodio::{OutputStreamBuilder, Sink, Source};

    use super::{AudioDevice, Beep, ChannelError, ToneOutput};

    /// Default output device, driven from a dedicated audio thread.
    #[derive(Default)]
    pub struct RodioDevice;

    impl RodioDevice {
        pub fn new() -> Self {
            Self
        }
    }

    struct RodioOutput {
        tx: Option<mpsc::Sender<Vec<Beep>>>,
    }

    impl AudioDevice for RodioDevice {
        /// Hands the device to a fresh audio thread and returns at once. If the
        /// device cannot be opened the thread exits, and later plays report it.
        fn open(&mut self) -> Result<Box<dyn ToneOutput>, ChannelError> {
            let (tx, rx) = mpsc::channel::<Vec<Beep>>();

            thread::Builder::new()
                .name("alarm-audio".to_string())
                .spawn(move || {
                    let mut stream = match OutputStreamBuilder::open_default_stream() {
                        Ok(stream) => stream,
                        Err(e) => {
                            warn!("No audio output device: {}", e);
                            return;
                        }
                    };
                    stream.log_on_drop(false);

                    // Ends when the output is closed and the sender dropped
                    while let Ok(beeps) = rx.recv() {
                        let sink = Sink::connect_new(stream.mixer());
                        let mut cursor = std::time::Duration::ZERO;
                        for beep in beeps {
                            let silence = beep.start.saturating_sub(cursor);
                            sink.append(
                                SquareWave::new(beep.frequency_hz)
                                    .take_duration(beep.duration)
                                    .amplify(beep.gain)
                                    .delay(silence),
                            );
                            cursor = beep.start + beep.duration;
                        }
                        sink.detach();
                    }
                    debug!("Audio thread stopped");
                })
                .map_err(|e| ChannelError::Platform(e.to_string()))?;

            Ok(Box::new(RodioOutput { tx: Some(tx) }))
        }
    }

    impl ToneOutput for RodioOutput {
        fn play(&mut self, beeps: &[Beep]) -> Result<(), ChannelError> {
            let tx = self.tx.as_ref().ok_or(ChannelError::Released)?;
            tx.send(beeps.to_vec())
                .map_err(|_| ChannelError::Unavailable("audio output"))
        }

        fn close(&mut self) {
            self.tx = None;
        }
    }
}
