use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// AOA thresholds are not finite and strictly increasing.
    #[error(
        "Thresholds must be strictly increasing: below L/DMax {below_ld_max} < below OnSpeed \
         {below_on_speed} < OnSpeed max {on_speed_max} < above OnSpeed {above_on_speed_max}"
    )]
    UnorderedThresholds {
        /// Lower boundary of the audible range.
        below_ld_max: f32,
        /// Upper boundary of the slow pulsing band.
        below_on_speed: f32,
        /// Upper boundary of the steady band.
        on_speed_max: f32,
        /// Upper boundary of the fast pulsing band.
        above_on_speed_max: f32,
    },

    /// IAS gate is negative or not finite.
    #[error("Invalid IAS tone enable value: {0} kn")]
    InvalidIasGate(f32),

    /// Aircraft identifier cannot be used as a file name.
    #[error("Invalid aircraft identifier: {0:?}")]
    InvalidAircraftId(String),
}
