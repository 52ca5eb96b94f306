use crate::tone::RawSample;

/// Delivers AOA/IAS readings to the engine, one per telemetry tick.
///
/// Implemented by: `ReplaySource`, `SweepSource`.
///
/// # Example
/// ```
/// use fos_core::traits::TelemetrySource;
/// use fos_core::tone::RawSample;
///
/// struct Hover;
/// impl TelemetrySource for Hover {
///     fn sample(&mut self) -> Option<RawSample> { Some(RawSample::new(8.0, 60.0)) }
///     fn name(&self) -> &str { "hover" }
/// }
/// ```
pub trait TelemetrySource: Send + 'static {
    /// Next reading.
    ///
    /// Returns `None` when the source is exhausted or can no longer produce
    /// readings. Never blocks beyond reading one record.
    fn sample(&mut self) -> Option<RawSample>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}
