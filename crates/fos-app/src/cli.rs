use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use fos_core::thresholds::ThresholdPatch;

use crate::telemetry::SweepSpec;

/// flyonspeed: angle-of-attack audio cues from recorded or synthetic telemetry.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Replay telemetry from a text file of `aoa ias` lines.
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Synthetic linear AOA ramp, e.g. `4:14:60`.
    #[arg(long, value_name = "FROM:TO:IAS")]
    pub sweep: Option<SweepSpec>,

    /// Duration of the synthetic ramp, seconds.
    #[arg(long, default_value_t = 20.0)]
    pub sweep_secs: f32,

    /// Telemetry tick rate, Hz (1 to 200).
    #[arg(long, default_value_t = 30)]
    pub rate: u32,

    /// TOML engine configuration. Defaults are used if the file is missing.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Directory holding `<aircraft>.json` threshold profiles.
    #[arg(long, default_value = "config/profiles")]
    pub profile_dir: PathBuf,

    /// Aircraft identifier selecting a threshold profile.
    #[arg(long)]
    pub aircraft: Option<String>,

    /// Override the L/DMax threshold, degrees.
    #[arg(long)]
    pub below_ld_max: Option<f32>,

    /// Override the bottom of the OnSpeed band, degrees.
    #[arg(long)]
    pub below_on_speed: Option<f32>,

    /// Override the top of the OnSpeed band, degrees.
    #[arg(long)]
    pub on_speed_max: Option<f32>,

    /// Override the stall warning threshold, degrees.
    #[arg(long)]
    pub above_on_speed: Option<f32>,

    /// Override the minimum airspeed for any tone, knots.
    #[arg(long)]
    pub ias_tone_enable: Option<f32>,

    /// Write the resulting thresholds to the aircraft's profile.
    #[arg(long, default_value_t = false, requires = "aircraft")]
    pub save_profile: bool,

    /// Start with sound disabled.
    #[arg(long, default_value_t = false)]
    pub mute: bool,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validate that exactly one telemetry source is provided.
    ///
    /// # Errors
    /// Returns an error if zero or more than one source is specified.
    pub fn validate_source(&self) -> anyhow::Result<()> {
        match (self.replay.is_some(), self.sweep.is_some()) {
            (true, true) => anyhow::bail!("Use one telemetry source at a time: --replay OR --sweep."),
            (false, false) => anyhow::bail!("No telemetry source. Use --replay <file> or --sweep FROM:TO:IAS."),
            _ => Ok(()),
        }
    }

    /// Telemetry rate after clamping.
    #[must_use]
    pub fn rate_hz(&self) -> u32 {
        self.rate.clamp(1, 200)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.rate_hz()
    }

    /// Number of ticks in the synthetic ramp.
    #[must_use]
    pub fn sweep_steps(&self) -> usize {
        let secs = if self.sweep_secs.is_finite() {
            self.sweep_secs.max(0.0)
        } else {
            0.0
        };
        ((secs * self.rate_hz() as f32) as usize).max(2)
    }

    /// Threshold flags as a partial override. Zero or negative entries leave
    /// the value unchanged.
    #[must_use]
    pub fn threshold_patch(&self) -> ThresholdPatch {
        ThresholdPatch {
            below_ld_max: self.below_ld_max,
            below_on_speed: self.below_on_speed,
            on_speed_max: self.on_speed_max,
            above_on_speed_max: self.above_on_speed,
            ias_tone_enable: self.ias_tone_enable,
        }
        .positive_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("flyonspeed").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn exactly_one_source_is_required() {
        assert!(parse(&[]).validate_source().is_err());
        assert!(parse(&["--replay", "a.txt"]).validate_source().is_ok());
        assert!(parse(&["--sweep", "4:14:60"]).validate_source().is_ok());
        assert!(
            parse(&["--replay", "a.txt", "--sweep", "4:14:60"])
                .validate_source()
                .is_err()
        );
    }

    #[test]
    fn rate_is_clamped() {
        assert_eq!(parse(&["--rate", "0"]).rate_hz(), 1);
        assert_eq!(parse(&["--rate", "1000"]).rate_hz(), 200);
        assert_eq!(parse(&[]).tick_interval(), Duration::from_secs(1) / 30);
    }

    #[test]
    fn sweep_steps_follow_rate_and_duration() {
        assert_eq!(parse(&["--rate", "10", "--sweep-secs", "3"]).sweep_steps(), 30);
        assert_eq!(parse(&["--sweep-secs", "0"]).sweep_steps(), 2);
    }

    #[test]
    fn threshold_flags_form_a_patch() {
        let cli = parse(&["--on-speed-max", "10.1", "--ias-tone-enable", "40"]);
        let patch = cli.threshold_patch();
        assert_eq!(patch.on_speed_max, Some(10.1));
        assert_eq!(patch.ias_tone_enable, Some(40.0));
        assert_eq!(patch.below_ld_max, None);
        assert!(parse(&[]).threshold_patch().is_empty());
        assert!(parse(&["--below-ld-max", "0"]).threshold_patch().is_empty());
    }

    #[test]
    fn save_profile_needs_an_aircraft() {
        let args = ["flyonspeed", "--sweep", "4:14:60", "--save-profile"];
        assert!(Cli::try_parse_from(args).is_err());
        assert!(parse(&["--aircraft", "RV-4", "--save-profile"]).save_profile);
    }

    #[test]
    fn malformed_sweep_is_rejected() {
        assert!(Cli::try_parse_from(["flyonspeed", "--sweep", "4:14"]).is_err());
    }
}
