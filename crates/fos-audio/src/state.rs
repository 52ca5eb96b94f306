use fos_core::tone::{FrequencyClass, PlaybackMode, ToneParameters};
use triple_buffer::TripleBuffer;

/// The record crossing from the sampler to the pulse scheduler.
///
/// Written once per telemetry tick, read once per scheduler iteration. The
/// reader always sees the newest write; superseded values are discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub smoothed_aoa: f32,
    /// Sound switched on by the host.
    pub enabled: bool,
    /// Classifier asked for discrete pulses.
    pub should_pulse: bool,
    pub mode: PlaybackMode,
    pub frequency: FrequencyClass,
    pub pulse_rate_hz: f32,
}

/// What the scheduler should be doing for a given snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackTarget {
    Idle,
    Steady,
    Pulse {
        frequency: FrequencyClass,
        rate_hz: f32,
    },
}

impl PlaybackSnapshot {
    #[must_use]
    pub fn target(&self) -> PlaybackTarget {
        if !self.enabled {
            return PlaybackTarget::Idle;
        }
        match self.mode {
            PlaybackMode::Steady => PlaybackTarget::Steady,
            PlaybackMode::Pulsing
                if self.should_pulse && self.pulse_rate_hz.is_finite() && self.pulse_rate_hz > 0.0 =>
            {
                PlaybackTarget::Pulse {
                    frequency: self.frequency,
                    rate_hz: self.pulse_rate_hz,
                }
            }
            PlaybackMode::Pulsing | PlaybackMode::Silent => PlaybackTarget::Idle,
        }
    }
}

/// Producer half, owned by the engine on the sampler thread.
pub struct PlaybackPublisher {
    input: triple_buffer::Input<PlaybackSnapshot>,
}

/// Consumer half, owned by the pulse scheduler thread.
pub struct PlaybackReader {
    output: triple_buffer::Output<PlaybackSnapshot>,
}

/// Create a connected publisher/reader pair holding a silent, disabled state.
///
/// # Example
/// ```
/// use fos_audio::state::{playback_channel, PlaybackTarget};
/// use fos_core::tone::{ToneParameters, Zone};
///
/// let (mut tx, mut rx) = playback_channel();
/// tx.publish(7.0, true, &ToneParameters::silent(Zone::BelowLdMax));
/// assert_eq!(rx.snapshot().target(), PlaybackTarget::Idle);
/// ```
#[must_use]
pub fn playback_channel() -> (PlaybackPublisher, PlaybackReader) {
    let (input, output) = TripleBuffer::new(&PlaybackSnapshot::default()).split();
    (PlaybackPublisher { input }, PlaybackReader { output })
}

impl PlaybackPublisher {
    /// Publish the latest classification. Lock-free, never blocks, no audio I/O.
    pub fn publish(&mut self, smoothed_aoa: f32, enabled: bool, params: &ToneParameters) {
        self.input.write(PlaybackSnapshot {
            smoothed_aoa,
            enabled,
            should_pulse: params.mode == PlaybackMode::Pulsing,
            mode: params.mode,
            frequency: params.frequency,
            pulse_rate_hz: params.pulse_rate_hz,
        });
    }
}

impl PlaybackReader {
    /// Most recently published state.
    pub fn snapshot(&mut self) -> PlaybackSnapshot {
        *self.output.read()
    }
}
