// Host-side tests for the analysis pipeline using an in-memory audio host.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use warp_core::constants::FFT_SIZE;
use warp_core::{
    AnalyserConfig, AnalysisFrame, AudioError, AudioHost, AudioPipeline, FrameChannel,
    PipelineState, SampleTap, SpectrumAnalyser,
};

#[derive(Clone, Default)]
struct SharedSamples(Arc<Mutex<Vec<f32>>>);

impl SharedSamples {
    fn push_sine(&self, bin: usize, amplitude: f32, len: usize) {
        let mut s = self.0.lock().unwrap();
        for n in 0..len {
            let x = 2.0 * PI * bin as f32 * n as f32 / FFT_SIZE as f32;
            s.push(amplitude * x.sin());
        }
    }
}

struct MemoryTap {
    samples: SharedSamples,
    released: Arc<AtomicBool>,
}

impl SampleTap for MemoryTap {
    fn read_window(&mut self, out: &mut [f32]) -> bool {
        let s = self.samples.0.lock().unwrap();
        if s.len() < out.len() {
            return false;
        }
        out.copy_from_slice(&s[s.len() - out.len()..]);
        true
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

struct MemoryHost {
    samples: SharedSamples,
    released: Arc<AtomicBool>,
    refuse: bool,
    opens: usize,
}

impl MemoryHost {
    fn new(samples: SharedSamples) -> Self {
        Self {
            samples,
            released: Arc::new(AtomicBool::new(false)),
            refuse: false,
            opens: 0,
        }
    }
}

impl AudioHost for MemoryHost {
    type Tap = MemoryTap;

    fn open_tap(&mut self) -> Result<MemoryTap, AudioError> {
        if self.refuse {
            return Err(AudioError::Unavailable("no user gesture yet".into()));
        }
        self.opens += 1;
        Ok(MemoryTap {
            samples: self.samples.clone(),
            released: Arc::clone(&self.released),
        })
    }
}

fn pipeline(samples: &SharedSamples) -> (AudioPipeline<MemoryHost>, FrameChannel) {
    let channel = FrameChannel::new();
    let p = AudioPipeline::new(
        MemoryHost::new(samples.clone()),
        channel.clone(),
        AnalyserConfig::default(),
    )
    .unwrap();
    (p, channel)
}

#[test]
fn ticks_before_begin_publish_nothing() {
    let samples = SharedSamples::default();
    samples.push_sine(4, 1.0, FFT_SIZE);
    let (mut p, channel) = pipeline(&samples);
    assert_eq!(p.state(), PipelineState::Idle);
    assert!(p.tick().is_none());
    assert_eq!(channel.publish_count(), 0);
    assert_eq!(channel.latest(), AnalysisFrame::ZERO);
}

#[test]
fn begin_is_idempotent() {
    let samples = SharedSamples::default();
    let (mut p, _channel) = pipeline(&samples);
    assert!(p.begin().is_ok());
    assert_eq!(p.begin(), Err(AudioError::DuplicateInit));
    assert_eq!(p.state(), PipelineState::Active);
    assert_eq!(p.host().opens, 1, "second begin must not open another tap");
}

#[test]
fn waits_for_source_to_fill_a_window() {
    let samples = SharedSamples::default();
    let (mut p, channel) = pipeline(&samples);
    p.begin().unwrap();
    samples.push_sine(4, 1.0, FFT_SIZE / 2);
    assert!(p.tick().is_none());
    samples.push_sine(4, 1.0, FFT_SIZE);
    assert!(p.tick().is_some());
    assert_eq!(channel.publish_count(), 1);
}

#[test]
fn bass_tone_lands_in_low_band() {
    let samples = SharedSamples::default();
    samples.push_sine(4, 1.0, FFT_SIZE);
    let (mut p, channel) = pipeline(&samples);
    p.begin().unwrap();
    let mut last = AnalysisFrame::ZERO;
    for _ in 0..30 {
        last = p.tick().expect("active pipeline with full window");
    }
    assert_eq!(channel.latest(), last);
    assert!(last.low > last.mid, "low {} mid {}", last.low, last.mid);
    assert!(last.high < 64.0, "high band should be near silent: {}", last.high);
}

#[test]
fn analysed_frames_stay_in_range() {
    let samples = SharedSamples::default();
    // Loud, clipped broadband content.
    {
        let mut s = samples.0.lock().unwrap();
        let mut seed: u32 = 0x1234_ABCD;
        for _ in 0..FFT_SIZE * 4 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            s.push((seed as f32 / u32::MAX as f32) * 8.0 - 4.0);
        }
    }
    let (mut p, _channel) = pipeline(&samples);
    p.begin().unwrap();
    for _ in 0..20 {
        let f = p.tick().unwrap();
        for v in [f.low, f.mid, f.high, f.total] {
            assert!((0.0..=255.0).contains(&v), "energy {v} out of range");
        }
    }
}

#[test]
fn refused_host_degrades_to_zero_frames() {
    let samples = SharedSamples::default();
    samples.push_sine(4, 1.0, FFT_SIZE);
    let (mut p, channel) = pipeline(&samples);
    p.host_mut().refuse = true;
    assert!(matches!(p.begin(), Err(AudioError::Unavailable(_))));
    assert_eq!(p.state(), PipelineState::Unavailable);
    assert!(p.tick().is_none());
    assert_eq!(channel.latest(), AnalysisFrame::ZERO);

    // A later gesture may retry.
    p.host_mut().refuse = false;
    assert!(p.begin().is_ok());
    assert_eq!(p.state(), PipelineState::Active);
}

#[test]
fn ticks_after_teardown_are_ignored() {
    let samples = SharedSamples::default();
    samples.push_sine(4, 1.0, FFT_SIZE);
    let (mut p, channel) = pipeline(&samples);
    p.begin().unwrap();
    assert!(p.tick().is_some());
    let released = Arc::clone(&p.host().released);

    p.teardown();
    assert!(released.load(Ordering::SeqCst), "tap must be released");
    assert_eq!(p.state(), PipelineState::Closed);
    assert!(p.tick().is_none());
    assert_eq!(channel.publish_count(), 1);
    assert!(p.begin().is_err());
}

#[test]
fn silence_maps_to_zero_spectrum() {
    let mut analyser = SpectrumAnalyser::new(AnalyserConfig::default()).unwrap();
    let bins = analyser.analyse(&[0.0; FFT_SIZE]);
    assert_eq!(bins.len(), FFT_SIZE / 2);
    assert!(bins.iter().all(|&b| b == 0));
}
