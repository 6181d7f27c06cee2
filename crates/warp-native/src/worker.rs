//! Dedicated analysis thread: ticks the pipeline at a fixed interval until
//! told to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use warp_core::{AudioError, AudioHost, AudioPipeline, PipelineState};

pub struct AnalysisWorker<H: AudioHost> {
    pipeline: Arc<Mutex<AudioPipeline<H>>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl<H> AnalysisWorker<H>
where
    H: AudioHost + Send + 'static,
{
    pub fn spawn(pipeline: AudioPipeline<H>, interval: Duration) -> anyhow::Result<Self> {
        let pipeline = Arc::new(Mutex::new(pipeline));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let pipeline = Arc::clone(&pipeline);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("audio-analysis".into())
                .spawn(move || {
                    while !stop.load(Ordering::Acquire) {
                        lock(&pipeline).tick();
                        thread::sleep(interval);
                    }
                })?
        };
        Ok(Self {
            pipeline,
            stop,
            handle: Some(handle),
        })
    }

    pub fn begin(&self) -> Result<(), AudioError> {
        lock(&self.pipeline).begin()
    }

    pub fn state(&self) -> PipelineState {
        lock(&self.pipeline).state()
    }

    /// Stop the thread, wait for it, then tear the pipeline down.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("[audio] analysis thread panicked");
            }
        }
        lock(&self.pipeline).teardown();
    }
}

impl<H: AudioHost> Drop for AnalysisWorker<H> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use warp_core::{AnalyserConfig, FrameChannel, SampleTap};

    struct ToneTap;

    impl SampleTap for ToneTap {
        fn read_window(&mut self, out: &mut [f32]) -> bool {
            for (n, s) in out.iter_mut().enumerate() {
                *s = (std::f32::consts::TAU * 4.0 * n as f32 / 256.0).sin();
            }
            true
        }
    }

    struct ToneHost;

    impl AudioHost for ToneHost {
        type Tap = ToneTap;

        fn open_tap(&mut self) -> Result<ToneTap, AudioError> {
            Ok(ToneTap)
        }
    }

    #[test]
    fn worker_publishes_after_begin_and_stops_on_shutdown() {
        let channel = FrameChannel::new();
        let pipeline =
            AudioPipeline::new(ToneHost, channel.clone(), AnalyserConfig::default()).unwrap();
        let mut worker = AnalysisWorker::spawn(pipeline, Duration::from_millis(2)).unwrap();
        assert_eq!(channel.publish_count(), 0);

        worker.begin().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while channel.publish_count() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(channel.publish_count() > 0, "worker never published");

        worker.shutdown();
        assert_eq!(worker.state(), PipelineState::Closed);
        let published = channel.publish_count();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(channel.publish_count(), published);
    }
}
