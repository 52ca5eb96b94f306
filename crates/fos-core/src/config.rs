use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::thresholds::{ThresholdPatch, ThresholdSet};
use crate::tone::FrequencyClass;

/// Number of filtered samples averaged by the AOA smoother.
pub const AOA_HISTORY_SIZE: usize = 20;

/// Complete engine configuration.
///
/// Serializable to TOML. Every field has a sane default; values read from a
/// file are clamped by [`EngineConfig::clamp_all`].
///
/// # Example
/// ```
/// use fos_core::config::EngineConfig;
/// let config = EngineConfig::default();
/// assert_eq!(config.filter.max_aoa_change, 6.0);
/// assert_eq!(config.pulse.idle_poll_ms, 50);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    pub filter: FilterConfig,
    pub tone: ToneConfig,
    pub pulse: PulseConfig,
    /// Fallback thresholds used when no aircraft profile overrides them.
    pub thresholds: ThresholdSet,
}

/// Spike rejection settings.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct FilterConfig {
    /// Largest accepted tick-to-tick AOA change, degrees. Larger jumps are
    /// treated as telemetry glitches.
    pub max_aoa_change: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_aoa_change: 6.0,
        }
    }
}

/// Waveform generation settings.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ToneConfig {
    /// Pitch of the low tone, Hz.
    pub normal_freq_hz: f32,
    /// Pitch of the high tone, Hz.
    pub high_freq_hz: f32,
    /// Length of one sine burst, seconds.
    pub burst_secs: f32,
    /// Output gain [0.0, 1.0].
    pub volume: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            normal_freq_hz: 400.0,
            high_freq_hz: 1600.0,
            burst_secs: 0.1,
            volume: 1.0,
        }
    }
}

impl ToneConfig {
    /// Pitch of `frequency`, Hz.
    #[must_use]
    pub fn frequency_hz(&self, frequency: FrequencyClass) -> f32 {
        match frequency {
            FrequencyClass::Normal => self.normal_freq_hz,
            FrequencyClass::High => self.high_freq_hz,
        }
    }
}

/// Pulse rate bounds (pulses per second) and scheduler timing.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct PulseConfig {
    /// Rate at L/DMax.
    pub rate_min: f32,
    /// Rate at the bottom of the OnSpeed band.
    pub rate_max: f32,
    /// Rate just above the OnSpeed band.
    pub above_rate_min: f32,
    /// Rate at the top of the high pulsing band.
    pub above_rate_max: f32,
    /// Stall warning rate beyond the last threshold.
    pub stall_rate: f32,
    /// Scheduler poll interval while idle or steady, milliseconds.
    pub idle_poll_ms: u64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            rate_min: 1.5,
            rate_max: 8.2,
            above_rate_min: 1.5,
            above_rate_max: 6.2,
            stall_rate: 20.0,
            idle_poll_ms: 50,
        }
    }
}

impl PulseConfig {
    #[must_use]
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

impl EngineConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    /// Non-finite values (TOML accepts `nan` and `inf`) fall back to the default.
    pub fn clamp_all(&mut self) {
        let filter = FilterConfig::default();
        let tone = ToneConfig::default();
        let pulse = PulseConfig::default();

        self.filter.max_aoa_change =
            sane(self.filter.max_aoa_change, filter.max_aoa_change, 0.1, 90.0);

        self.tone.normal_freq_hz = sane(self.tone.normal_freq_hz, tone.normal_freq_hz, 50.0, 8000.0);
        self.tone.high_freq_hz = sane(self.tone.high_freq_hz, tone.high_freq_hz, 50.0, 8000.0);
        self.tone.burst_secs = sane(self.tone.burst_secs, tone.burst_secs, 0.01, 1.0);
        self.tone.volume = sane(self.tone.volume, tone.volume, 0.0, 1.0);

        self.pulse.rate_min = sane(self.pulse.rate_min, pulse.rate_min, 0.1, 50.0);
        self.pulse.rate_max = sane(self.pulse.rate_max, pulse.rate_max, self.pulse.rate_min, 50.0);
        self.pulse.above_rate_min =
            sane(self.pulse.above_rate_min, pulse.above_rate_min, 0.1, 50.0);
        self.pulse.above_rate_max = sane(
            self.pulse.above_rate_max,
            pulse.above_rate_max,
            self.pulse.above_rate_min,
            50.0,
        );
        self.pulse.stall_rate = sane(self.pulse.stall_rate, pulse.stall_rate, 0.1, 50.0);
        self.pulse.idle_poll_ms = self.pulse.idle_poll_ms.clamp(5, 500);
    }
}

/// `value` clamped to `[lo, hi]`, or `default` clamped likewise if `value` is
/// not finite. `lo <= hi` holds for every call site.
fn sane(value: f32, default: f32, lo: f32, hi: f32) -> f32 {
    let v = if value.is_finite() {
        value
    } else {
        log::warn!("Non-finite config value {value} replaced by {default}");
        default
    };
    v.clamp(lo, hi)
}

/// Intermediate TOML structure: every section and field optional.
#[derive(Deserialize)]
struct ConfigFile {
    filter: Option<FilterSection>,
    tone: Option<ToneSection>,
    pulse: Option<PulseSection>,
    thresholds: Option<ThresholdPatch>,
}

#[derive(Deserialize)]
struct FilterSection {
    max_aoa_change: Option<f32>,
}

#[derive(Deserialize)]
struct ToneSection {
    normal_freq_hz: Option<f32>,
    high_freq_hz: Option<f32>,
    burst_secs: Option<f32>,
    volume: Option<f32>,
}

#[derive(Deserialize)]
struct PulseSection {
    rate_min: Option<f32>,
    rate_max: Option<f32>,
    above_rate_min: Option<f32>,
    above_rate_max: Option<f32>,
    stall_rate: Option<f32>,
    idle_poll_ms: Option<u64>,
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML or the resulting
/// thresholds are not strictly increasing.
pub fn parse_config(content: &str) -> Result<EngineConfig> {
    let file: ConfigFile = toml::from_str(content).context("TOML parse error")?;
    let mut config = EngineConfig::default();

    if let Some(f) = file.filter
        && let Some(v) = f.max_aoa_change
    {
        config.filter.max_aoa_change = v;
    }

    if let Some(t) = file.tone {
        if let Some(v) = t.normal_freq_hz {
            config.tone.normal_freq_hz = v;
        }
        if let Some(v) = t.high_freq_hz {
            config.tone.high_freq_hz = v;
        }
        if let Some(v) = t.burst_secs {
            config.tone.burst_secs = v;
        }
        if let Some(v) = t.volume {
            config.tone.volume = v;
        }
    }

    if let Some(p) = file.pulse {
        if let Some(v) = p.rate_min {
            config.pulse.rate_min = v;
        }
        if let Some(v) = p.rate_max {
            config.pulse.rate_max = v;
        }
        if let Some(v) = p.above_rate_min {
            config.pulse.above_rate_min = v;
        }
        if let Some(v) = p.above_rate_max {
            config.pulse.above_rate_max = v;
        }
        if let Some(v) = p.stall_rate {
            config.pulse.stall_rate = v;
        }
        if let Some(v) = p.idle_poll_ms {
            config.pulse.idle_poll_ms = v;
        }
    }

    if let Some(patch) = file.thresholds {
        config.thresholds = config
            .thresholds
            .merged(&patch)
            .context("Invalid [thresholds] section")?;
    }

    config.clamp_all();
    Ok(config)
}

/// Load a TOML file and merge it over the defaults.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use fos_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("In {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.filter.max_aoa_change, 6.0);
        assert_eq!(config.pulse.stall_rate, 20.0);
        assert_eq!(config.thresholds, ThresholdSet::default());
    }

    #[test]
    fn partial_sections_override_and_clamp() {
        let config = parse_config(
            r"
            [tone]
            volume = 3.0
            high_freq_hz = 1200.0

            [pulse]
            idle_poll_ms = 1
            rate_max = 9.0

            [thresholds]
            on_speed_max = 10.0
            ",
        )
        .unwrap();
        assert_eq!(config.tone.volume, 1.0);
        assert_eq!(config.tone.high_freq_hz, 1200.0);
        assert_eq!(config.tone.normal_freq_hz, 400.0);
        assert_eq!(config.pulse.idle_poll_ms, 5);
        assert_eq!(config.pulse.rate_max, 9.0);
        assert_eq!(config.thresholds.on_speed_max, 10.0);
        assert_eq!(config.thresholds.below_ld_max, 6.0);
    }

    #[test]
    fn non_finite_values_fall_back_to_defaults() {
        let config = parse_config(
            r"
            [filter]
            max_aoa_change = nan

            [tone]
            volume = nan
            high_freq_hz = inf

            [pulse]
            rate_min = nan
            rate_max = nan
            above_rate_min = -inf
            stall_rate = inf
            ",
        )
        .unwrap();
        let defaults = EngineConfig::default();
        assert_eq!(config.filter.max_aoa_change, defaults.filter.max_aoa_change);
        assert_eq!(config.tone.volume, defaults.tone.volume);
        assert_eq!(config.tone.high_freq_hz, defaults.tone.high_freq_hz);
        assert_eq!(config.pulse.rate_min, defaults.pulse.rate_min);
        assert_eq!(config.pulse.rate_max, defaults.pulse.rate_max);
        assert_eq!(config.pulse.above_rate_min, defaults.pulse.above_rate_min);
        assert_eq!(config.pulse.stall_rate, defaults.pulse.stall_rate);
    }

    #[test]
    fn rate_max_is_raised_to_rate_min() {
        let config = parse_config("[pulse]\nrate_min = 12.0\nrate_max = 3.0\n").unwrap();
        assert_eq!(config.pulse.rate_max, 12.0);
    }

    #[test]
    fn negative_file_thresholds_are_kept() {
        let config = parse_config(
            r"
            [thresholds]
            below_ld_max = -2.0
            below_on_speed = 1.5
            ",
        )
        .unwrap();
        assert_eq!(config.thresholds.below_ld_max, -2.0);
        assert_eq!(config.thresholds.below_on_speed, 1.5);
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let result = parse_config(
            r"
            [thresholds]
            below_ld_max = 8.0
            ",
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "[filter]\nmax_aoa_change = 4.5\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.filter.max_aoa_change, 4.5);

        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
