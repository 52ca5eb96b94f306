use fos_core::config::PulseConfig;
use fos_core::thresholds::ThresholdSet;
use fos_core::tone::{FrequencyClass, PlaybackMode, ToneParameters, Zone};

/// Map a smoothed AOA and the current airspeed to tone parameters.
///
/// Zones, in ascending AOA (boundaries belong to the lower zone):
///
/// | AOA                                   | Mode    | Pitch  | Rate                         |
/// |---------------------------------------|---------|--------|------------------------------|
/// | `< below_ld_max`                      | Silent  |        |                              |
/// | `[below_ld_max, below_on_speed]`      | Pulsing | Normal | `rate_min..=rate_max`        |
/// | `(below_on_speed, on_speed_max]`      | Steady  | Normal |                              |
/// | `(on_speed_max, above_on_speed_max]`  | Pulsing | High   | `above_rate_min..=above_rate_max` |
/// | `> above_on_speed_max`                | Pulsing | High   | `stall_rate`                 |
///
/// Below `ias_tone_enable` the result is Silent regardless of AOA.
///
/// # Example
/// ```
/// use fos_audio::classifier::classify;
/// use fos_core::config::PulseConfig;
/// use fos_core::thresholds::ThresholdSet;
/// use fos_core::tone::PlaybackMode;
///
/// let p = classify(8.0, 60.0, &ThresholdSet::default(), &PulseConfig::default());
/// assert_eq!(p.mode, PlaybackMode::Steady);
/// ```
#[must_use]
pub fn classify(aoa: f32, ias: f32, t: &ThresholdSet, pulse: &PulseConfig) -> ToneParameters {
    if ias.is_nan() || ias < t.ias_tone_enable {
        return ToneParameters::silent(Zone::BelowIasGate);
    }

    if aoa.is_nan() || aoa < t.below_ld_max {
        ToneParameters::silent(Zone::BelowLdMax)
    } else if aoa <= t.below_on_speed {
        pulsing(
            Zone::BelowOnSpeed,
            FrequencyClass::Normal,
            interpolate(aoa, t.below_ld_max, t.below_on_speed, pulse.rate_min, pulse.rate_max),
        )
    } else if aoa <= t.on_speed_max {
        ToneParameters {
            mode: PlaybackMode::Steady,
            frequency: FrequencyClass::Normal,
            pulse_rate_hz: 0.0,
            zone: Zone::OnSpeed,
        }
    } else if aoa <= t.above_on_speed_max {
        pulsing(
            Zone::AboveOnSpeed,
            FrequencyClass::High,
            interpolate(
                aoa,
                t.on_speed_max,
                t.above_on_speed_max,
                pulse.above_rate_min,
                pulse.above_rate_max,
            ),
        )
    } else {
        pulsing(Zone::StallWarning, FrequencyClass::High, pulse.stall_rate)
    }
}

fn pulsing(zone: Zone, frequency: FrequencyClass, pulse_rate_hz: f32) -> ToneParameters {
    ToneParameters {
        mode: PlaybackMode::Pulsing,
        frequency,
        pulse_rate_hz,
        zone,
    }
}

/// Linear rate law over `[lo, hi]`.
///
/// `t` is clamped to `[0, 1]` so an unordered or zero-width band cannot push
/// the rate outside `[rate_lo, rate_hi]`.
#[inline]
fn interpolate(aoa: f32, lo: f32, hi: f32, rate_lo: f32, rate_hi: f32) -> f32 {
    let span = hi - lo;
    let t = if span > f32::EPSILON {
        ((aoa - lo) / span).clamp(0.0, 1.0)
    } else {
        1.0
    };
    rate_lo + t * (rate_hi - rate_lo)
}
