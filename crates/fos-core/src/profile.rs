//! Per-aircraft threshold profiles.
//!
//! A profile is a small JSON object stored as `<aircraft id>.json`:
//!
//! ```json
//! {"Below LDMax": 6.0, "Below OnSpeed": 7.3, "OnSpeed Max": 9.6,
//!  "Above OnSpeed": 12.5, "IAS Tone Enable": 25.0}
//! ```
//!
//! Missing keys keep the current value. A missing file is not an error: the
//! aircraft simply has no override.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::thresholds::{ThresholdPatch, ThresholdSet};

#[derive(Debug, Default, Deserialize, Serialize)]
struct ProfileFile {
    #[serde(rename = "Below LDMax", skip_serializing_if = "Option::is_none")]
    below_ld_max: Option<f32>,
    #[serde(rename = "Below OnSpeed", skip_serializing_if = "Option::is_none")]
    below_on_speed: Option<f32>,
    #[serde(rename = "OnSpeed Max", skip_serializing_if = "Option::is_none")]
    on_speed_max: Option<f32>,
    #[serde(rename = "Above OnSpeed", skip_serializing_if = "Option::is_none")]
    above_on_speed_max: Option<f32>,
    #[serde(rename = "IAS Tone Enable", skip_serializing_if = "Option::is_none")]
    ias_tone_enable: Option<f32>,
}

impl From<ProfileFile> for ThresholdPatch {
    fn from(p: ProfileFile) -> Self {
        Self {
            below_ld_max: p.below_ld_max,
            below_on_speed: p.below_on_speed,
            on_speed_max: p.on_speed_max,
            above_on_speed_max: p.above_on_speed_max,
            ias_tone_enable: p.ias_tone_enable,
        }
    }
}

impl From<&ThresholdSet> for ProfileFile {
    fn from(t: &ThresholdSet) -> Self {
        Self {
            below_ld_max: Some(t.below_ld_max),
            below_on_speed: Some(t.below_on_speed),
            on_speed_max: Some(t.on_speed_max),
            above_on_speed_max: Some(t.above_on_speed_max),
            ias_tone_enable: Some(t.ias_tone_enable),
        }
    }
}

/// Path of the profile for `aircraft_id` inside `dir`.
///
/// # Errors
/// Returns [`CoreError::InvalidAircraftId`] for empty identifiers or ones
/// that would escape `dir`.
pub fn profile_path(dir: &Path, aircraft_id: &str) -> Result<PathBuf, CoreError> {
    let id = aircraft_id.trim();
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(CoreError::InvalidAircraftId(aircraft_id.to_string()));
    }
    Ok(dir.join(format!("{id}.json")))
}

/// Read a profile. Returns `Ok(None)` if the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or is not a valid
/// profile object.
pub fn load_profile(path: &Path) -> Result<Option<ThresholdPatch>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Cannot read {}", path.display())),
    };
    let file: ProfileFile = serde_json::from_str(&content)
        .with_context(|| format!("JSON parse error in {}", path.display()))?;
    Ok(Some(file.into()))
}

/// Write `thresholds` as a complete profile.
///
/// # Errors
/// Returns an error if the set is invalid or the file cannot be written.
pub fn save_profile(path: &Path, thresholds: &ThresholdSet) -> Result<()> {
    thresholds.validate()?;
    let json = serde_json::to_string_pretty(&ProfileFile::from(thresholds))?;
    std::fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
    log::info!("Profile saved to {}", path.display());
    Ok(())
}

/// Resolve the thresholds for a profile file on top of `base`.
///
/// Never fails: a missing file keeps `base` (logged at info), an unreadable or
/// invalid one keeps `base` (logged at warn).
#[must_use]
pub fn resolve_thresholds(base: &ThresholdSet, path: &Path) -> ThresholdSet {
    match load_profile(path) {
        Ok(Some(patch)) => match base.merged(&patch) {
            Ok(t) => {
                log::info!("Thresholds loaded from {}", path.display());
                t
            }
            Err(e) => {
                log::warn!("Profile {} rejected: {e}", path.display());
                *base
            }
        },
        Ok(None) => {
            log::info!("No profile at {}, using defaults", path.display());
            *base
        }
        Err(e) => {
            log::warn!("Profile error: {e:#}");
            *base
        }
    }
}
