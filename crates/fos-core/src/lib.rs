//! Configuration, thresholds, and shared types for the FlyOnSpeed tone engine.
//!
//! This crate holds everything the sampler side and the audio side agree on:
//! telemetry samples, tone parameters, threshold sets, and their loaders.

pub mod config;
pub mod error;
pub mod profile;
pub mod thresholds;
pub mod tone;
pub mod traits;

pub use config::EngineConfig;
pub use error::CoreError;
pub use thresholds::{ThresholdPatch, ThresholdSet};
pub use tone::{FrequencyClass, PlaybackMode, RawSample, ToneParameters, Zone};
pub use traits::TelemetrySource;
