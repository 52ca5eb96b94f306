use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use fos_core::config::ToneConfig;
use fos_core::tone::FrequencyClass;

use crate::error::AudioError;
use crate::player::{ToneBank, TonePlayer};

const NORMAL: u8 = 0;
const HIGH: u8 = 1;

/// State shared between the control side and the cpal callback.
struct Voice {
    bank: ToneBank,
    active: AtomicU8,
    looping: AtomicBool,
    playing: AtomicBool,
    /// Set by a play command; the callback rewinds and clears it.
    restart: AtomicBool,
    pos: AtomicUsize,
    /// Set by the stream error callback; cleared by the next render, which
    /// proves the stream is alive again.
    faulted: AtomicBool,
}

impl Voice {
    fn new(bank: ToneBank) -> Self {
        Self {
            bank,
            active: AtomicU8::new(NORMAL),
            looping: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            restart: AtomicBool::new(false),
            pos: AtomicUsize::new(0),
            faulted: AtomicBool::new(false),
        }
    }

    fn frequency(&self) -> FrequencyClass {
        if self.active.load(Ordering::Relaxed) == HIGH {
            FrequencyClass::High
        } else {
            FrequencyClass::Normal
        }
    }

    fn start(&self, looping: bool) -> Result<(), AudioError> {
        if self.faulted.load(Ordering::Relaxed) {
            return Err(AudioError::StreamError("output stream has failed".into()));
        }
        self.looping.store(looping, Ordering::Relaxed);
        self.restart.store(true, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Fill one interleaved output buffer. Runs on the audio thread.
    fn render<T: Sample + FromSample<f32>>(&self, data: &mut [T], channels: usize) {
        if self.faulted.swap(false, Ordering::Relaxed) {
            log::info!("Audio output recovered");
        }
        if !self.playing.load(Ordering::SeqCst) {
            data.fill(T::EQUILIBRIUM);
            return;
        }
        let buf = self.bank.get(self.frequency());
        let looping = self.looping.load(Ordering::Relaxed);
        let mut pos = if self.restart.swap(false, Ordering::SeqCst) {
            0
        } else {
            self.pos.load(Ordering::Relaxed)
        };
        let mut finished = buf.is_empty();

        for frame in data.chunks_mut(channels.max(1)) {
            let sample = if finished {
                0.0
            } else if looping {
                let s = buf[pos % buf.len()];
                pos = (pos + 1) % buf.len();
                s
            } else if pos < buf.len() {
                let s = buf[pos] * self.bank.burst_envelope(pos, buf.len());
                pos += 1;
                s
            } else {
                finished = true;
                0.0
            };
            frame.fill(T::from_sample(sample));
        }

        self.pos.store(pos, Ordering::Relaxed);
        if finished {
            self.end_burst();
        }
    }

    /// Mark a finished one-shot burst as stopped, unless a play command
    /// arrived meanwhile.
    ///
    /// `start` raises `restart` before `playing`, so a command racing with
    /// the exchange either sees `playing` already cleared and sets it again,
    /// or left `restart` set for the check below.
    fn end_burst(&self) {
        if self
            .playing
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            && self.restart.load(Ordering::SeqCst)
        {
            self.playing.store(true, Ordering::SeqCst);
        }
    }
}

/// Tone player on the default cpal output device.
///
/// Both bursts are generated at the device rate when the stream opens; the
/// callback only copies samples and never allocates.
pub struct CpalTonePlayer {
    voice: Arc<Voice>,
    _stream: cpal::Stream,
}

impl CpalTonePlayer {
    /// Open the default output device and start a silent stream.
    ///
    /// # Errors
    /// Fails when there is no output device, its sample format is not
    /// supported, or the stream cannot be built or started.
    pub fn open(config: &ToneConfig) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let supported = device.default_output_config()?;
        let format = supported.sample_format();
        let sample_rate = supported.sample_rate().0;
        let channels = usize::from(supported.channels());
        let stream_config: cpal::StreamConfig = supported.config();

        let voice = Arc::new(Voice::new(ToneBank::new(config, sample_rate)));
        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, channels, &voice)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, channels, &voice)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, channels, &voice)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}")).into()),
        };
        stream.play()?;

        log::info!(
            "Tone output: {} @ {sample_rate}Hz, {channels}ch, {format:?}",
            device.name().unwrap_or_else(|_| "unknown device".into())
        );
        Ok(Self {
            voice,
            _stream: stream,
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    voice: &Arc<Voice>,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let render_voice = Arc::clone(voice);
    let fault_voice = Arc::clone(voice);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            render_voice.render(data, channels);
        },
        move |err| {
            log::error!("Audio output error: {err}");
            fault_voice.faulted.store(true, Ordering::Relaxed);
        },
        None,
    )?;
    Ok(stream)
}

impl TonePlayer for CpalTonePlayer {
    fn select_buffer(&mut self, frequency: FrequencyClass) {
        let id = match frequency {
            FrequencyClass::Normal => NORMAL,
            FrequencyClass::High => HIGH,
        };
        self.voice.active.store(id, Ordering::Relaxed);
    }

    fn play_once(&mut self) -> Result<(), AudioError> {
        self.voice.start(false)
    }

    fn play_looped(&mut self) -> Result<(), AudioError> {
        self.voice.start(true)
    }

    fn stop(&mut self) {
        self.voice.playing.store(false, Ordering::Release);
    }

    fn is_playing(&self) -> bool {
        self.voice.playing.load(Ordering::Acquire)
    }
}

impl Drop for CpalTonePlayer {
    fn drop(&mut self) {
        self.stop();
        log::debug!("Tone output closed");
    }
}
