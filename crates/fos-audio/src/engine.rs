use std::sync::Arc;

use arc_swap::ArcSwap;
use fos_core::config::{EngineConfig, PulseConfig, ToneConfig};
use fos_core::error::CoreError;
use fos_core::thresholds::ThresholdSet;
use fos_core::tone::{RawSample, ToneParameters};

use crate::classifier::classify;
use crate::filter::AoaFilter;
use crate::player::TonePlayer;
use crate::scheduler::{SchedulerHandle, spawn_scheduler};
use crate::state::{PlaybackPublisher, playback_channel};

/// Result of feeding one telemetry sample through the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub smoothed_aoa: f32,
    pub params: ToneParameters,
    /// Thresholds the sample was classified against.
    pub thresholds: ThresholdSet,
}

/// Sampler-side half of the tone engine.
///
/// Owns the AOA filter and the publishing end of the playback state. The
/// pulse scheduler runs on its own thread from [`AudioEngine::start`] until
/// [`AudioEngine::shutdown`] (or drop). `tick` never blocks and performs no
/// audio I/O.
pub struct AudioEngine {
    filter: AoaFilter,
    thresholds: Arc<ArcSwap<ThresholdSet>>,
    pulse: PulseConfig,
    tone: ToneConfig,
    publisher: PlaybackPublisher,
    enabled: bool,
    scheduler: Option<SchedulerHandle>,
}

impl AudioEngine {
    /// Start the pulse scheduler with a player built on its thread.
    ///
    /// The engine starts enabled. `thresholds` is shared: anything storing a
    /// new set into it (hot reload, [`AudioEngine::update_thresholds`]) is
    /// picked up on the next tick.
    ///
    /// # Errors
    /// Returns an error if the scheduler thread cannot start or `make_player`
    /// fails.
    pub fn start<P, F>(
        config: &EngineConfig,
        thresholds: Arc<ArcSwap<ThresholdSet>>,
        make_player: F,
    ) -> anyhow::Result<Self>
    where
        P: TonePlayer + 'static,
        F: FnOnce() -> anyhow::Result<P> + Send + 'static,
    {
        let (publisher, reader) = playback_channel();
        let scheduler = spawn_scheduler(reader, config.pulse.idle_poll(), make_player)?;
        log::info!(
            "Audio engine started (max AOA change {:.1} deg)",
            config.filter.max_aoa_change
        );
        Ok(Self {
            filter: AoaFilter::new(config.filter.max_aoa_change),
            thresholds,
            pulse: config.pulse,
            tone: config.tone,
            publisher,
            enabled: true,
            scheduler: Some(scheduler),
        })
    }

    /// Filter, classify and publish one sample.
    pub fn tick(&mut self, sample: RawSample) -> TickReport {
        let smoothed_aoa = self.filter.filter(sample.aoa_degrees);
        let thresholds = self.thresholds.load();
        let params = classify(smoothed_aoa, sample.ias_knots, &thresholds, &self.pulse);
        self.publisher.publish(smoothed_aoa, self.enabled, &params);

        log::debug!(
            "raw {:.2} -> smoothed {smoothed_aoa:.2}, ias {:.1}: {params}",
            sample.aoa_degrees,
            sample.ias_knots
        );
        TickReport {
            smoothed_aoa,
            params,
            thresholds: **thresholds,
        }
    }

    /// Status line for a tick: the active boundary while silent, the pitch in
    /// Hz and the pulse rate while pulsing.
    #[must_use]
    pub fn status_line(&self, report: &TickReport) -> String {
        report.params.status_line(&report.thresholds, &self.tone)
    }

    /// Mute or unmute. Takes effect on the next tick.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::info!("Tone {}", if enabled { "enabled" } else { "muted" });
        }
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Thresholds the next tick will classify against.
    #[must_use]
    pub fn thresholds(&self) -> ThresholdSet {
        **self.thresholds.load()
    }

    /// Replace the live thresholds after validating them.
    ///
    /// # Errors
    /// Returns [`CoreError`] and keeps the current set if `next` is invalid.
    pub fn update_thresholds(&self, next: ThresholdSet) -> Result<(), CoreError> {
        next.validate()?;
        self.thresholds.store(Arc::new(next));
        log::info!("Thresholds updated: {next:?}");
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(SchedulerHandle::is_running)
    }

    /// Silence output, stop the scheduler, and release the player.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            self.enabled = false;
            self.publisher.publish(
                self.filter.last_valid(),
                false,
                &ToneParameters::default(),
            );
            scheduler.stop();
            log::info!("Audio engine stopped");
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::{Duration, Instant};

    use fos_core::tone::{FrequencyClass, PlaybackMode, Zone};

    use super::*;
    use crate::player::mock::{Call, Recorder};

    fn start(recorder: &Recorder) -> AudioEngine {
        let player = recorder.player();
        AudioEngine::start(
            &EngineConfig::default(),
            Arc::new(ArcSwap::from_pointee(ThresholdSet::default())),
            move || Ok(player),
        )
        .unwrap()
    }

    /// Poll until `pred` holds or two seconds pass.
    fn wait_for(pred: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if pred() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        pred()
    }

    #[test]
    fn approach_through_the_filter() {
        let recorder = Recorder::default();
        let mut engine = start(&recorder);

        let first = engine.tick(RawSample::new(6.0, 30.0));
        assert_eq!(first.smoothed_aoa, 6.0);
        assert_eq!(first.params.zone, Zone::BelowOnSpeed);
        assert_eq!(first.params.frequency, FrequencyClass::Normal);

        let mut last = first;
        for _ in 0..40 {
            last = engine.tick(RawSample::new(8.5, 30.0));
        }
        assert!((last.smoothed_aoa - 8.5).abs() < 1e-4);
        assert_eq!(last.params.mode, PlaybackMode::Steady);
        assert!(wait_for(|| recorder.count(Call::PlayLooped) >= 1));

        engine.shutdown();
    }

    #[test]
    fn spike_does_not_reach_the_classifier() {
        let recorder = Recorder::default();
        let mut engine = start(&recorder);
        engine.tick(RawSample::new(8.0, 40.0));
        let report = engine.tick(RawSample::new(30.0, 40.0));
        assert_eq!(report.smoothed_aoa, 8.0);
        assert_eq!(report.params.zone, Zone::OnSpeed);
    }

    #[test]
    fn muted_engine_never_plays() {
        let recorder = Recorder::default();
        let mut engine = start(&recorder);
        engine.set_enabled(false);
        assert!(!engine.is_enabled());
        for _ in 0..5 {
            let report = engine.tick(RawSample::new(15.0, 60.0));
            // Classification still runs while muted.
            assert_eq!(report.params.zone, Zone::StallWarning);
        }
        thread::sleep(Duration::from_millis(120));
        assert_eq!(recorder.count(Call::PlayOnce), 0);
        assert_eq!(recorder.count(Call::PlayLooped), 0);
    }

    #[test]
    fn threshold_update_applies_on_next_tick() {
        let recorder = Recorder::default();
        let mut engine = start(&recorder);
        assert_eq!(
            engine.tick(RawSample::new(10.0, 40.0)).params.zone,
            Zone::AboveOnSpeed
        );

        let widened = ThresholdSet {
            on_speed_max: 10.5,
            ..ThresholdSet::default()
        };
        engine.update_thresholds(widened).unwrap();
        assert_eq!(engine.thresholds(), widened);
        assert_eq!(
            engine.tick(RawSample::new(10.0, 40.0)).params.zone,
            Zone::OnSpeed
        );
    }

    #[test]
    fn invalid_update_keeps_current_thresholds() {
        let recorder = Recorder::default();
        let engine = start(&recorder);
        let unordered = ThresholdSet {
            below_on_speed: 5.0,
            ..ThresholdSet::default()
        };
        assert!(matches!(
            engine.update_thresholds(unordered),
            Err(CoreError::UnorderedThresholds { .. })
        ));
        assert_eq!(engine.thresholds(), ThresholdSet::default());
    }

    #[test]
    fn external_store_is_seen_by_tick() {
        let recorder = Recorder::default();
        let shared = Arc::new(ArcSwap::from_pointee(ThresholdSet::default()));
        let player = recorder.player();
        let mut engine =
            AudioEngine::start(&EngineConfig::default(), Arc::clone(&shared), move || {
                Ok(player)
            })
            .unwrap();

        shared.store(Arc::new(ThresholdSet {
            ias_tone_enable: 80.0,
            ..ThresholdSet::default()
        }));
        let report = engine.tick(RawSample::new(8.0, 60.0));
        assert_eq!(report.params.zone, Zone::BelowIasGate);
    }

    #[test]
    fn status_line_names_the_numbers() {
        let recorder = Recorder::default();
        let mut engine = start(&recorder);

        let parked = engine.tick(RawSample::new(8.0, 10.0));
        assert_eq!(engine.status_line(&parked), "Audio: None - Below IAS 25.0");

        let mut low = parked;
        for _ in 0..25 {
            low = engine.tick(RawSample::new(7.0, 60.0));
        }
        assert_eq!(low.params.zone, Zone::BelowOnSpeed);
        let line = engine.status_line(&low);
        assert!(line.starts_with("Audio: Pulsing - Below OnSpeed | Hz: 400.0 pps: "), "{line}");
    }

    #[test]
    fn shutdown_silences_and_releases_player() {
        let recorder = Recorder::default();
        let mut engine = start(&recorder);
        engine.tick(RawSample::new(8.0, 40.0));
        assert!(wait_for(|| recorder.count(Call::PlayLooped) == 1));
        assert!(engine.is_running());

        engine.shutdown();
        assert!(recorder.released.load(Ordering::SeqCst));
        assert_eq!(recorder.calls().last(), Some(&Call::Stop));
    }

    #[test]
    fn player_failure_aborts_start() {
        let result = AudioEngine::start(
            &EngineConfig::default(),
            Arc::new(ArcSwap::from_pointee(ThresholdSet::default())),
            || -> anyhow::Result<crate::player::mock::RecordingPlayer> {
                anyhow::bail!("no output device")
            },
        );
        assert!(result.is_err());
    }
}
