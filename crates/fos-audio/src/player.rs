use std::f32::consts::TAU;

use fos_core::config::ToneConfig;
use fos_core::tone::FrequencyClass;

use crate::error::AudioError;

/// Output device driven exclusively by the pulse scheduler.
///
/// Owns two precomputed waveforms and plays whichever one is selected.
/// Implementations must make `select_buffer` safe only while stopped; the
/// scheduler always stops before switching.
pub trait TonePlayer {
    /// Make `frequency` the waveform used by subsequent play commands.
    fn select_buffer(&mut self, frequency: FrequencyClass);

    /// Play the selected waveform once from the start.
    ///
    /// # Errors
    /// Returns an error if the device cannot play right now.
    fn play_once(&mut self) -> Result<(), AudioError>;

    /// Play the selected waveform in a continuous loop.
    ///
    /// # Errors
    /// Returns an error if the device cannot play right now.
    fn play_looped(&mut self) -> Result<(), AudioError>;

    /// Stop playback immediately. Idempotent.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}

/// Fade length at both ends of a one-shot burst, seconds.
const FADE_SECS: f32 = 0.002;

/// The two sine bursts, generated once at the output sample rate.
///
/// # Example
/// ```
/// use fos_audio::player::ToneBank;
/// use fos_core::config::ToneConfig;
/// use fos_core::tone::FrequencyClass;
///
/// let bank = ToneBank::new(&ToneConfig::default(), 44_100);
/// assert_eq!(bank.get(FrequencyClass::High).len(), 4_410);
/// ```
#[derive(Clone, Debug)]
pub struct ToneBank {
    normal: Vec<f32>,
    high: Vec<f32>,
    fade_len: usize,
}

impl ToneBank {
    #[must_use]
    pub fn new(config: &ToneConfig, sample_rate: u32) -> Self {
        Self {
            normal: generate_tone(config.normal_freq_hz, config.burst_secs, sample_rate, config.volume),
            high: generate_tone(config.high_freq_hz, config.burst_secs, sample_rate, config.volume),
            fade_len: ((FADE_SECS * sample_rate as f32) as usize).max(1),
        }
    }

    #[must_use]
    pub fn get(&self, frequency: FrequencyClass) -> &[f32] {
        match frequency {
            FrequencyClass::Normal => &self.normal,
            FrequencyClass::High => &self.high,
        }
    }

    /// Gain at `pos` of a one-shot burst of `len` samples: linear ramps at both
    /// ends so a pulse neither starts nor ends with a click.
    #[inline]
    #[must_use]
    pub fn burst_envelope(&self, pos: usize, len: usize) -> f32 {
        let fade = self.fade_len.min(len / 2).max(1);
        let edge = pos.min(len.saturating_sub(1).saturating_sub(pos));
        if edge < fade {
            edge as f32 / fade as f32
        } else {
            1.0
        }
    }
}

/// Mono sine burst of `duration` seconds.
///
/// Unshaped, so a burst holding a whole number of cycles (the defaults do)
/// loops without a seam.
#[must_use]
pub fn generate_tone(frequency: f32, duration: f32, sample_rate: u32, volume: f32) -> Vec<f32> {
    let rate = sample_rate as f32;
    let len = (duration * rate) as usize;
    (0..len)
        .map(|i| volume * (TAU * frequency * i as f32 / rate).sin())
        .collect()
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use super::{AudioError, FrequencyClass, TonePlayer};

    /// A command issued to [`RecordingPlayer`].
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub enum Call {
        Select(FrequencyClass),
        PlayOnce,
        PlayLooped,
        Stop,
    }

    /// Handles shared between a test and the player living on the scheduler thread.
    #[derive(Clone, Default)]
    pub struct Recorder {
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub fail_plays: Arc<AtomicBool>,
        pub released: Arc<AtomicBool>,
    }

    impl Recorder {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        pub fn count(&self, call: Call) -> usize {
            self.calls().iter().filter(|&&c| c == call).count()
        }

        pub fn player(&self) -> RecordingPlayer {
            RecordingPlayer {
                recorder: self.clone(),
                looping: false,
            }
        }
    }

    /// Records every command; failed plays are recorded too.
    pub struct RecordingPlayer {
        recorder: Recorder,
        looping: bool,
    }

    impl RecordingPlayer {
        fn record(&self, call: Call) {
            if let Ok(mut calls) = self.recorder.calls.lock() {
                calls.push(call);
            }
        }

        fn check(&self) -> Result<(), AudioError> {
            if self.recorder.fail_plays.load(Ordering::SeqCst) {
                Err(AudioError::StreamError("device unplugged".into()))
            } else {
                Ok(())
            }
        }
    }

    impl TonePlayer for RecordingPlayer {
        fn select_buffer(&mut self, frequency: FrequencyClass) {
            self.record(Call::Select(frequency));
        }

        fn play_once(&mut self) -> Result<(), AudioError> {
            self.record(Call::PlayOnce);
            self.check()?;
            self.looping = false;
            Ok(())
        }

        fn play_looped(&mut self) -> Result<(), AudioError> {
            self.record(Call::PlayLooped);
            self.check()?;
            self.looping = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.record(Call::Stop);
            self.looping = false;
        }

        fn is_playing(&self) -> bool {
            self.looping
        }
    }

    impl Drop for RecordingPlayer {
        fn drop(&mut self) {
            self.recorder.released.store(true, Ordering::SeqCst);
        }
    }
}
