use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use fos_core::profile::load_profile;
use fos_core::thresholds::ThresholdSet;
use notify::{Event, EventKind, RecursiveMode, Watcher};

/// Watch an aircraft profile and swap valid edits into the live thresholds.
///
/// The parent directory is watched so editors that replace the file on save
/// are seen too. The returned watcher must stay alive while the app runs.
///
/// # Errors
/// Returns an error if the watcher cannot be created or the directory cannot
/// be watched.
pub fn spawn_profile_watcher(
    profile_path: &Path,
    thresholds: &Arc<ArcSwap<ThresholdSet>>,
) -> Result<impl Watcher + use<>> {
    let thresholds = Arc::clone(thresholds);
    let path = profile_path.to_path_buf();
    let dir = watched_dir(profile_path);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == path.file_name())
        {
            reload_profile(&path, &thresholds);
        }
    })?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Cannot watch {}", dir.display()))?;
    log::info!("Watching {} for threshold changes", profile_path.display());
    Ok(watcher)
}

fn watched_dir(profile_path: &Path) -> PathBuf {
    match profile_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Merge the profile onto the live thresholds if the result is valid.
///
/// Returns whether a new set was stored. On any failure the current set stays.
pub fn reload_profile(path: &Path, thresholds: &ArcSwap<ThresholdSet>) -> bool {
    let patch = match load_profile(path) {
        Ok(Some(patch)) => patch,
        Ok(None) => {
            log::warn!("Profile {} removed, keeping thresholds", path.display());
            return false;
        }
        Err(e) => {
            log::warn!("Profile reload failed: {e:#}");
            return false;
        }
    };

    let current = **thresholds.load();
    match current.merged(&patch) {
        Ok(next) if next == current => false,
        Ok(next) => {
            thresholds.store(Arc::new(next));
            log::info!("Thresholds reloaded from {}: {next:?}", path.display());
            true
        }
        Err(e) => {
            log::warn!("Profile {} rejected: {e}", path.display());
            false
        }
    }
}
