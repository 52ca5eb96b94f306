use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// AOA zone boundaries and the airspeed gate.
///
/// The four AOA thresholds (degrees) must be strictly increasing for the
/// pulse-rate interpolation to be monotonic. The classifier tolerates an
/// unordered set, but every loader goes through [`ThresholdSet::validate`]
/// before a set becomes live.
///
/// # Example
/// ```
/// use fos_core::thresholds::ThresholdSet;
/// let t = ThresholdSet::default();
/// assert!(t.validate().is_ok());
/// assert_eq!(t.ias_tone_enable, 25.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdSet {
    /// Below this is "Below L/DMax": no tone.
    pub below_ld_max: f32,
    /// Between L/DMax and this: low pulses, rate rising with AOA.
    pub below_on_speed: f32,
    /// Upper bound of the steady OnSpeed band (inclusive).
    pub on_speed_max: f32,
    /// Upper bound of the high pulsing band; beyond is stall warning.
    pub above_on_speed_max: f32,
    /// Minimum IAS (knots) for any tone.
    pub ias_tone_enable: f32,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            below_ld_max: 6.0,
            below_on_speed: 7.3,
            on_speed_max: 9.6,
            above_on_speed_max: 12.5,
            ias_tone_enable: 25.0,
        }
    }
}

impl ThresholdSet {
    /// Check ordering and finiteness.
    ///
    /// # Errors
    /// Returns [`CoreError::UnorderedThresholds`] if the AOA boundaries are not
    /// finite and strictly increasing, or [`CoreError::InvalidIasGate`] if the
    /// airspeed gate is negative or not finite.
    pub fn validate(&self) -> Result<(), CoreError> {
        let aoa = [
            self.below_ld_max,
            self.below_on_speed,
            self.on_speed_max,
            self.above_on_speed_max,
        ];
        let ordered = aoa.iter().all(|v| v.is_finite()) && aoa.windows(2).all(|w| w[0] < w[1]);
        if !ordered {
            return Err(CoreError::UnorderedThresholds {
                below_ld_max: self.below_ld_max,
                below_on_speed: self.below_on_speed,
                on_speed_max: self.on_speed_max,
                above_on_speed_max: self.above_on_speed_max,
            });
        }
        if !self.ias_tone_enable.is_finite() || self.ias_tone_enable < 0.0 {
            return Err(CoreError::InvalidIasGate(self.ias_tone_enable));
        }
        Ok(())
    }

    /// Apply a partial override and validate the result.
    ///
    /// # Errors
    /// Returns the validation error of the merged set; `self` is untouched.
    pub fn merged(&self, patch: &ThresholdPatch) -> Result<Self, CoreError> {
        let merged = Self {
            below_ld_max: patch.below_ld_max.unwrap_or(self.below_ld_max),
            below_on_speed: patch.below_on_speed.unwrap_or(self.below_on_speed),
            on_speed_max: patch.on_speed_max.unwrap_or(self.on_speed_max),
            above_on_speed_max: patch.above_on_speed_max.unwrap_or(self.above_on_speed_max),
            ias_tone_enable: patch.ias_tone_enable.unwrap_or(self.ias_tone_enable),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Partial threshold override. `None` keeps the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ThresholdPatch {
    pub below_ld_max: Option<f32>,
    pub below_on_speed: Option<f32>,
    pub on_speed_max: Option<f32>,
    pub above_on_speed_max: Option<f32>,
    pub ias_tone_enable: Option<f32>,
}

impl ThresholdPatch {
    /// `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.below_ld_max.is_none()
            && self.below_on_speed.is_none()
            && self.on_speed_max.is_none()
            && self.above_on_speed_max.is_none()
            && self.ias_tone_enable.is_none()
    }

    /// Drop entries that are not strictly positive.
    ///
    /// Threshold entry forms treat an empty or zero field as "unchanged";
    /// files take their values as written.
    #[must_use]
    pub fn positive_only(self) -> Self {
        fn keep(name: &str, value: Option<f32>) -> Option<f32> {
            match value {
                Some(v) if v > 0.0 => Some(v),
                Some(v) => {
                    log::debug!("Ignoring {name} = {v}: entry left unchanged");
                    None
                }
                None => None,
            }
        }
        Self {
            below_ld_max: keep("below_ld_max", self.below_ld_max),
            below_on_speed: keep("below_on_speed", self.below_on_speed),
            on_speed_max: keep("on_speed_max", self.on_speed_max),
            above_on_speed_max: keep("above_on_speed_max", self.above_on_speed_max),
            ias_tone_enable: keep("ias_tone_enable", self.ias_tone_enable),
        }
    }
}
