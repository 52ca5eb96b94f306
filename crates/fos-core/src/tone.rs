use std::fmt;

use crate::config::ToneConfig;
use crate::thresholds::ThresholdSet;

/// One telemetry reading. Produced once per tick, never retained.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawSample {
    /// Angle of attack in degrees.
    pub aoa_degrees: f32,
    /// Indicated airspeed in knots.
    pub ias_knots: f32,
}

impl RawSample {
    #[must_use]
    pub fn new(aoa_degrees: f32, ias_knots: f32) -> Self {
        Self {
            aoa_degrees,
            ias_knots,
        }
    }
}

/// Which of the two precomputed waveforms is audible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrequencyClass {
    /// Low pitch: below and inside the OnSpeed band.
    #[default]
    Normal,
    /// High pitch: above the OnSpeed band and stall warning.
    High,
}

/// How the tone is delivered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    /// No sound.
    #[default]
    Silent,
    /// Continuous loop.
    Steady,
    /// Discrete bursts at `pulse_rate_hz`.
    Pulsing,
}

/// AOA region that produced a set of tone parameters.
///
/// Ordered from slowest to most critical; used for status display and for
/// logging zone transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Zone {
    /// Airspeed below the tone enable gate (e.g. on the ground).
    #[default]
    BelowIasGate,
    /// AOA below L/DMax: no cue.
    BelowLdMax,
    /// Between L/DMax and the OnSpeed band: slow-to-fast low pulses.
    BelowOnSpeed,
    /// Target band: steady tone.
    OnSpeed,
    /// Above the OnSpeed band: high pulses.
    AboveOnSpeed,
    /// Beyond the last threshold: stall warning rate.
    StallWarning,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Zone::BelowIasGate => "None - Below IAS",
            Zone::BelowLdMax => "None - Below L/DMax",
            Zone::BelowOnSpeed => "Pulsing - Below OnSpeed",
            Zone::OnSpeed => "Steady - OnSpeed",
            Zone::AboveOnSpeed => "Pulsing - Above OnSpeed",
            Zone::StallWarning => "Pulsing - Stall Warning",
        };
        f.write_str(label)
    }
}

/// Classifier output, recomputed every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToneParameters {
    pub mode: PlaybackMode,
    pub frequency: FrequencyClass,
    /// Pulses per second. Meaningful only when `mode == Pulsing`.
    pub pulse_rate_hz: f32,
    pub zone: Zone,
}

impl ToneParameters {
    /// Silence attributed to `zone`.
    #[must_use]
    pub fn silent(zone: Zone) -> Self {
        Self {
            mode: PlaybackMode::Silent,
            frequency: FrequencyClass::Normal,
            pulse_rate_hz: 0.0,
            zone,
        }
    }

    /// Status line naming the boundary that silences the tone, or the pitch
    /// and rate while pulsing.
    #[must_use]
    pub fn status_line(&self, thresholds: &ThresholdSet, tone: &ToneConfig) -> String {
        match self.zone {
            Zone::BelowIasGate => format!("Audio: {} {:.1}", self.zone, thresholds.ias_tone_enable),
            Zone::BelowLdMax => format!("Audio: {} {:.1}", self.zone, thresholds.below_ld_max),
            _ if self.mode == PlaybackMode::Pulsing => format!(
                "Audio: {} | Hz: {:.1} pps: {:.1}",
                self.zone,
                tone.frequency_hz(self.frequency),
                self.pulse_rate_hz
            ),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for ToneParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            PlaybackMode::Pulsing => write!(
                f,
                "Audio: {} ({:?} pitch, {:.1} pps)",
                self.zone, self.frequency, self.pulse_rate_hz
            ),
            PlaybackMode::Steady | PlaybackMode::Silent => write!(f, "Audio: {}", self.zone),
        }
    }
}
