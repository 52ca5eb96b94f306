use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use clap::Parser;
use fos_audio::AudioEngine;
use fos_audio::output::CpalTonePlayer;
use fos_core::config::{EngineConfig, load_config};
use fos_core::profile::{profile_path, resolve_thresholds, save_profile};
use fos_core::thresholds::ThresholdSet;
use fos_core::tone::{RawSample, Zone};
use fos_core::traits::TelemetrySource;

pub mod cli;
pub mod hotreload;
pub mod telemetry;

fn main() -> Result<()> {
    // 1. CLI
    let cli = cli::Cli::parse();

    // 2. Logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Telemetry comes first: without it there is nothing to announce.
    let (mut source, first) = match open_telemetry(&cli) {
        Ok(opened) => opened,
        Err(e) => {
            log::error!("Telemetry unavailable: {e:#}");
            return Err(e);
        }
    };

    // 4. Configuration and thresholds
    let config = resolve_config(&cli)?;
    let profile = cli
        .aircraft
        .as_deref()
        .map(|id| profile_path(&cli.profile_dir, id))
        .transpose()?;
    let thresholds = resolve_live_thresholds(&cli, &config, profile.as_deref())?;
    let thresholds = Arc::new(ArcSwap::from_pointee(thresholds));

    // 5. Profile hot reload
    let _watcher = profile.as_ref().and_then(|path| {
        hotreload::spawn_profile_watcher(path, &thresholds)
            .inspect_err(|e| log::warn!("Profile hot reload disabled: {e:#}"))
            .ok()
    });

    // 6. Ctrl-C
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("Cannot install Ctrl-C handler")?;
    }

    // 7. Engine, with the output device opened on the pulse thread
    let tone = config.tone;
    let mut engine = AudioEngine::start(&config, thresholds, move || {
        CpalTonePlayer::open(&tone)
    })?;
    engine.set_enabled(!cli.mute);

    // 8. Sampler loop
    log::info!("Telemetry: {} @ {}Hz", source.name(), cli.rate_hz());
    let ticks = run_sampler(
        &mut engine,
        first,
        source.as_mut(),
        cli.tick_interval(),
        &running,
    );
    log::info!("{ticks} telemetry ticks processed");

    // 9. Silence and release the device
    engine.shutdown();
    Ok(())
}

/// Open the selected source and take its first reading.
fn open_telemetry(cli: &cli::Cli) -> Result<(Box<dyn TelemetrySource>, RawSample)> {
    cli.validate_source()?;
    let mut source: Box<dyn TelemetrySource> = match (&cli.replay, cli.sweep) {
        (Some(path), _) => Box::new(telemetry::ReplaySource::open(path)?),
        (None, Some(spec)) => Box::new(telemetry::SweepSource::new(spec, cli.sweep_steps())),
        (None, None) => anyhow::bail!("No telemetry source"),
    };
    let Some(first) = source.sample() else {
        anyhow::bail!("Telemetry source '{}' produced no readings", source.name());
    };
    Ok((source, first))
}

/// Config file if present, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<EngineConfig> {
    if cli.config.exists() {
        load_config(&cli.config)
    } else {
        log::warn!(
            "Config not found: {}. Using defaults.",
            cli.config.display()
        );
        Ok(EngineConfig::default())
    }
}

/// Configured thresholds, then the aircraft profile, then CLI overrides.
fn resolve_live_thresholds(
    cli: &cli::Cli,
    config: &EngineConfig,
    profile: Option<&Path>,
) -> Result<ThresholdSet> {
    let mut thresholds = match profile {
        Some(path) => resolve_thresholds(&config.thresholds, path),
        None => config.thresholds,
    };

    let patch = cli.threshold_patch();
    if !patch.is_empty() {
        thresholds = thresholds
            .merged(&patch)
            .context("Threshold overrides rejected")?;
        log::info!("Threshold overrides applied: {thresholds:?}");
    }

    if cli.save_profile {
        let Some(path) = profile else {
            anyhow::bail!("--save-profile requires --aircraft");
        };
        save_profile(path, &thresholds)?;
    }
    Ok(thresholds)
}

/// Tick the engine at a fixed rate until the source ends or `running` clears.
///
/// Returns the number of ticks processed.
fn run_sampler(
    engine: &mut AudioEngine,
    first: RawSample,
    source: &mut dyn TelemetrySource,
    interval: Duration,
    running: &AtomicBool,
) -> usize {
    let mut zone: Option<Zone> = None;
    let mut next = Some(first);
    let mut ticks = 0;
    let mut deadline = Instant::now();

    while let Some(sample) = next {
        if !running.load(Ordering::SeqCst) {
            log::info!("Interrupted");
            break;
        }

        let report = engine.tick(sample);
        ticks += 1;
        if zone != Some(report.params.zone) {
            log::info!("AOA {:.1}: {}", report.smoothed_aoa, engine.status_line(&report));
            zone = Some(report.params.zone);
        }

        deadline += interval;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            deadline = now;
        }
        next = source.sample();
    }

    if ticks > 0 && running.load(Ordering::SeqCst) {
        log::info!("Telemetry '{}' exhausted", source.name());
    }
    ticks
}
