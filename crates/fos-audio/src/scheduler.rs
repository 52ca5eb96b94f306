use std::thread::{self, JoinHandle};
use std::time::Duration;

use fos_core::tone::FrequencyClass;

use crate::player::TonePlayer;
use crate::state::{PlaybackReader, PlaybackTarget};

/// What the scheduler is currently doing with the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing playing; polling shared state at the idle interval.
    Idle,
    /// Looping the normal tone; polling at the idle interval.
    Steady,
    PulsingNormal,
    PulsingHigh,
}

/// Turns the shared playback state into timed player commands.
///
/// Each [`PulseScheduler::step`] reads the newest snapshot once, issues at
/// most a handful of commands, and returns how long to wait before the next
/// step. The player is never touched while idle.
pub struct PulseScheduler<P: TonePlayer> {
    player: P,
    reader: PlaybackReader,
    idle_poll: Duration,
    state: SchedulerState,
    /// Buffer currently loaded in the player.
    selected: Option<FrequencyClass>,
}

impl<P: TonePlayer> PulseScheduler<P> {
    #[must_use]
    pub fn new(player: P, reader: PlaybackReader, idle_poll: Duration) -> Self {
        Self {
            player,
            reader,
            idle_poll,
            state: SchedulerState::Idle,
            selected: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run one iteration and return the wait before the next one.
    pub fn step(&mut self) -> Duration {
        match self.reader.snapshot().target() {
            PlaybackTarget::Idle => self.idle(),
            PlaybackTarget::Steady => self.steady(),
            PlaybackTarget::Pulse { frequency, rate_hz } => self.pulse(frequency, rate_hz),
        }
    }

    fn idle(&mut self) -> Duration {
        if self.state != SchedulerState::Idle {
            self.player.stop();
            self.transition(SchedulerState::Idle);
        }
        self.idle_poll
    }

    fn steady(&mut self) -> Duration {
        if self.state != SchedulerState::Steady {
            self.player.stop();
            self.select(FrequencyClass::Normal);
            self.transition(SchedulerState::Steady);
        }
        // Also covers a loop that died with the device: retried every poll.
        if !self.player.is_playing()
            && let Err(e) = self.player.play_looped()
        {
            log::debug!("Steady tone not started: {e}");
        }
        self.idle_poll
    }

    fn pulse(&mut self, frequency: FrequencyClass, rate_hz: f32) -> Duration {
        let next = match frequency {
            FrequencyClass::Normal => SchedulerState::PulsingNormal,
            FrequencyClass::High => SchedulerState::PulsingHigh,
        };

        // A buffer switch must never overlap a playing sample, and a steady
        // loop must not keep running under the pulses.
        if self.state == SchedulerState::Steady || self.selected != Some(frequency) {
            self.player.stop();
        }
        self.select(frequency);
        self.transition(next);

        if let Err(e) = self.player.play_once() {
            log::debug!("Pulse skipped: {e}");
        }
        Duration::from_secs_f32(1.0 / rate_hz)
    }

    fn select(&mut self, frequency: FrequencyClass) {
        if self.selected != Some(frequency) {
            self.player.select_buffer(frequency);
            self.selected = Some(frequency);
        }
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            log::debug!("Pulse scheduler: {:?} -> {next:?}", self.state);
            self.state = next;
        }
    }

    /// Stop playback and hand back the player.
    pub fn finish(mut self) -> P {
        self.player.stop();
        self.player
    }
}

/// Drive `scheduler` until `stop_rx` receives a message or disconnects.
///
/// The wait between steps is a `recv_timeout` on the stop channel, so a
/// shutdown request interrupts even a long pulse interval.
pub fn run<P: TonePlayer>(mut scheduler: PulseScheduler<P>, stop_rx: &flume::Receiver<()>) -> P {
    loop {
        let wait = scheduler.step();
        match stop_rx.recv_timeout(wait) {
            Err(flume::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }
    scheduler.finish()
}

/// Handle to the background pulse thread. Dropping it stops and joins the thread.
pub struct SchedulerHandle {
    stop_tx: Option<flume::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

/// Spawn the pulse thread.
///
/// The player is built by `make_player` on the new thread and never leaves
/// it; it is stopped and dropped when the thread exits. Returns once the
/// player exists.
///
/// # Errors
/// Returns an error if the thread cannot be spawned or `make_player` fails.
/// Nothing is left running in either case.
pub fn spawn_scheduler<P, F>(
    reader: PlaybackReader,
    idle_poll: Duration,
    make_player: F,
) -> anyhow::Result<SchedulerHandle>
where
    P: TonePlayer + 'static,
    F: FnOnce() -> anyhow::Result<P> + Send + 'static,
{
    let (stop_tx, stop_rx) = flume::bounded::<()>(1);
    let (ready_tx, ready_rx) = flume::bounded::<anyhow::Result<()>>(1);

    let thread = thread::Builder::new()
        .name("fos-pulse".to_string())
        .spawn(move || {
            let player = match make_player() {
                Ok(p) => p,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            log::info!("Pulse scheduler started");

            let player = run(PulseScheduler::new(player, reader, idle_poll), &stop_rx);
            drop(player);
            log::info!("Pulse scheduler stopped, player released");
        })?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(SchedulerHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e.context("Tone player initialization failed"))
        }
        Err(_) => {
            let _ = thread.join();
            anyhow::bail!("Pulse thread exited during startup")
        }
    }
}

impl SchedulerHandle {
    /// Request shutdown and wait for the thread to release the player.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::error!("Pulse thread panicked");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
