// ---------------- Native audio (cpal) ----------------
//
// Playback and the analysis tap share one mono sample ring: the output
// callback writes every sample it plays and the analysis worker copies the
// newest window out of it.

use std::f32::consts::TAU;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rand::prelude::*;

use warp_core::{AudioError, AudioHost, SampleTap};

/// Ring length in mono samples; several analysis windows at 48 kHz.
const RING_CAPACITY: usize = 4096;
const DEMO_BPM: f32 = 120.0;
const MASTER_GAIN: f32 = 0.8;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SampleRing {
    buf: Vec<f32>,
    head: usize,
    filled: usize,
}

impl SampleRing {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(1)],
            head: 0,
            filled: 0,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.buf[self.head] = sample;
        self.head = (self.head + 1) % self.buf.len();
        self.filled = (self.filled + 1).min(self.buf.len());
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.filled = 0;
    }

    /// Copy the newest `out.len()` samples, oldest first. `false` until that
    /// many samples have been pushed.
    pub fn copy_latest(&self, out: &mut [f32]) -> bool {
        let n = out.len();
        let len = self.buf.len();
        if n > self.filled {
            return false;
        }
        let start = (self.head + len - n) % len;
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.buf[(start + i) % len];
        }
        true
    }
}

/// Decoded WAV, downmixed to mono and looped.
pub struct WavTrack {
    samples: Vec<f32>,
    sample_rate: f32,
    pos: f64,
}

impl WavTrack {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };
        let channels = spec.channels.max(1) as usize;
        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        if samples.is_empty() {
            anyhow::bail!("{} contains no audio", path.display());
        }
        log::info!(
            "[audio] loaded {} ({} Hz, {} ch, {:.1}s)",
            path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len() as f32 / spec.sample_rate as f32
        );
        Ok(Self {
            samples,
            sample_rate: spec.sample_rate as f32,
            pos: 0.0,
        })
    }

    fn next_sample(&mut self, out_rate: f32) -> f32 {
        let len = self.samples.len();
        let i = self.pos as usize % len;
        let frac = self.pos.fract() as f32;
        let a = self.samples[i];
        let b = self.samples[(i + 1) % len];
        self.pos = (self.pos + (self.sample_rate / out_rate) as f64) % len as f64;
        a + (b - a) * frac
    }
}

/// Four-on-the-floor kick, backbeat snare and offbeat hats, so the field has
/// something to react to without a file.
pub struct DemoPattern {
    n: u64,
    noise: StdRng,
    last_noise: f32,
}

impl DemoPattern {
    pub fn new(seed: u64) -> Self {
        Self {
            n: 0,
            noise: StdRng::seed_from_u64(seed),
            last_noise: 0.0,
        }
    }

    fn next_sample(&mut self, out_rate: f32) -> f32 {
        let t = self.n as f32 / out_rate;
        self.n += 1;
        let beat_sec = 60.0 / DEMO_BPM;
        let beat = t / beat_sec;
        let since_beat = beat.fract() * beat_sec;
        let since_eighth = (beat * 2.0).fract() * beat_sec / 2.0;
        let noise: f32 = self.noise.gen_range(-1.0..1.0);
        let bright_noise = noise - self.last_noise;
        self.last_noise = noise;

        // Pitch sweeps from ~155 Hz down to 45 Hz; phase is the integral.
        let kick_phase = TAU * (45.0 * since_beat + 110.0 / 30.0 * (1.0 - (-30.0 * since_beat).exp()));
        let kick = kick_phase.sin() * (-6.0 * since_beat).exp();

        let snare = if (beat as u32) % 2 == 1 {
            let env = (-18.0 * since_beat).exp();
            noise * env * 0.4 + (TAU * 190.0 * since_beat).sin() * env * 0.3
        } else {
            0.0
        };

        let hat = if (beat * 2.0) as u32 % 2 == 1 {
            bright_noise * (-60.0 * since_eighth).exp() * 0.15
        } else {
            0.0
        };

        let pad = [220.0, 277.18, 329.63]
            .iter()
            .map(|f| (TAU * f * t).sin())
            .sum::<f32>()
            * 0.03
            * (1.0 + (TAU * 0.125 * t).sin());

        ((kick + snare + hat + pad) * MASTER_GAIN).tanh()
    }
}

pub enum Track {
    Wav(WavTrack),
    Demo(DemoPattern),
}

impl Track {
    pub fn load(path: Option<&Path>, seed: u64) -> anyhow::Result<Self> {
        match path {
            Some(p) => Ok(Self::Wav(WavTrack::open(p)?)),
            None => {
                log::info!("[audio] no --track given, using the demo pattern");
                Ok(Self::Demo(DemoPattern::new(seed)))
            }
        }
    }

    fn next_sample(&mut self, out_rate: f32) -> f32 {
        match self {
            Self::Wav(w) => w.next_sample(out_rate),
            Self::Demo(d) => d.next_sample(out_rate),
        }
    }
}

/// Output stream owner. Lives on the main thread (`cpal::Stream` is not
/// `Send`); only the ring and the live flag cross to the analysis worker.
pub struct Player {
    track: Arc<Mutex<Track>>,
    ring: Arc<Mutex<SampleRing>>,
    live: Arc<AtomicBool>,
    stream: Option<cpal::Stream>,
}

impl Player {
    pub fn new(track: Track) -> Self {
        Self {
            track: Arc::new(Mutex::new(track)),
            ring: Arc::new(Mutex::new(SampleRing::with_capacity(RING_CAPACITY))),
            live: Arc::new(AtomicBool::new(false)),
            stream: None,
        }
    }

    /// Audio host for the analysis pipeline; taps succeed once playing.
    pub fn tap_host(&self) -> RingTapHost {
        RingTapHost {
            ring: Arc::clone(&self.ring),
            live: Arc::clone(&self.live),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the default output device and start playback. No-op when
    /// already playing.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let unavailable = |e: &dyn std::fmt::Display| AudioError::Unavailable(e.to_string());
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Unavailable("no output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| unavailable(&e))?;
        let format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();
        let stream = match format {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &stream_config),
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &stream_config),
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &stream_config),
            other => {
                return Err(AudioError::Unavailable(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| unavailable(&e))?;
        stream.play().map_err(|e| unavailable(&e))?;
        log::info!(
            "[audio] playback started {} Hz, {} ch",
            stream_config.sample_rate.0,
            stream_config.channels
        );
        self.stream = Some(stream);
        self.live.store(true, Ordering::Release);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.live.store(false, Ordering::Release);
        if self.stream.take().is_some() {
            lock(&self.ring).clear();
            log::info!("[audio] playback stopped");
        }
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let track = Arc::clone(&self.track);
        let ring = Arc::clone(&self.ring);
        let channels = config.channels.max(1) as usize;
        let sample_rate = config.sample_rate.0 as f32;
        device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut track = lock(&track);
                let mut ring = lock(&ring);
                for frame in data.chunks_mut(channels) {
                    let s = track.next_sample(sample_rate);
                    ring.push(s);
                    let v = T::from_sample(s);
                    for out in frame.iter_mut() {
                        *out = v;
                    }
                }
            },
            |err| log::error!("[audio] stream error: {err}"),
            None,
        )
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct RingTapHost {
    ring: Arc<Mutex<SampleRing>>,
    live: Arc<AtomicBool>,
}

impl AudioHost for RingTapHost {
    type Tap = RingTap;

    fn open_tap(&mut self) -> Result<RingTap, AudioError> {
        if !self.live.load(Ordering::Acquire) {
            return Err(AudioError::Unavailable("audio output is not playing".into()));
        }
        Ok(RingTap {
            ring: Arc::clone(&self.ring),
        })
    }
}

pub struct RingTap {
    ring: Arc<Mutex<SampleRing>>,
}

impl SampleTap for RingTap {
    fn read_window(&mut self, out: &mut [f32]) -> bool {
        lock(&self.ring).copy_latest(out)
    }

    fn release(&mut self) {
        lock(&self.ring).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_track_scales_integer_pcm_and_downmixes_to_mono() {
        let path = std::env::temp_dir().join(format!("warp_wav_{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for (l, r) in [(16384i16, 16384i16), (-32768, -32768), (32767, -32768), (8192, 0)] {
            writer.write_sample(l).unwrap();
            writer.write_sample(r).unwrap();
        }
        writer.finalize().unwrap();

        let track = WavTrack::open(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(track.sample_rate, 8000.0);
        assert_eq!(track.samples.len(), 4);
        assert!(track.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!((track.samples[0] - 0.5).abs() < 1e-6);
        assert!((track.samples[1] + 1.0).abs() < 1e-6);
        assert!(track.samples[2].abs() < 1e-4);
        assert!((track.samples[3] - 0.125).abs() < 1e-6);
    }

    #[test]
    fn ring_reports_short_until_window_is_full() {
        let mut ring = SampleRing::with_capacity(8);
        let mut out = [0.0; 4];
        for i in 0..3 {
            ring.push(i as f32);
        }
        assert!(!ring.copy_latest(&mut out));
        ring.push(3.0);
        assert!(ring.copy_latest(&mut out));
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn ring_returns_newest_samples_after_wrapping() {
        let mut ring = SampleRing::with_capacity(4);
        for i in 0..10 {
            ring.push(i as f32);
        }
        let mut out = [0.0; 3];
        assert!(ring.copy_latest(&mut out));
        assert_eq!(out, [7.0, 8.0, 9.0]);
        ring.clear();
        assert!(!ring.copy_latest(&mut out));
    }

    #[test]
    fn tap_host_refuses_until_playing() {
        let player = Player::new(Track::Demo(DemoPattern::new(1)));
        let mut host = player.tap_host();
        assert!(matches!(host.open_tap(), Err(AudioError::Unavailable(_))));
        player.live.store(true, Ordering::Release);
        let mut tap = host.open_tap().unwrap();
        lock(&player.ring).push(0.5);
        let mut out = [0.0; 1];
        assert!(tap.read_window(&mut out));
        assert_eq!(out, [0.5]);
    }

    #[test]
    fn demo_pattern_stays_in_range() {
        let mut demo = DemoPattern::new(3);
        for _ in 0..48_000 {
            let s = demo.next_sample(48_000.0);
            assert!(s.is_finite() && s.abs() <= 1.0);
        }
    }
}
