//! Lazily started audio analysis: tap → spectrum → band frame → channel.

use crate::analysis::{AnalyserConfig, SpectrumAnalyser};
use crate::channel::FrameChannel;
use crate::error::{AudioError, ConfigError};
use crate::frame::AnalysisFrame;

/// A live view onto the samples the audio source is currently producing.
pub trait SampleTap: Send {
    /// Copy the newest `out.len()` mono samples into `out`.
    ///
    /// Returns `false` while the source has not yet produced a full window;
    /// `out` is left unspecified in that case.
    fn read_window(&mut self, out: &mut [f32]) -> bool;

    /// Detach from the source and free any host resources.
    fn release(&mut self) {}
}

/// Creates the processing context and taps the audio source.
///
/// Opening may be refused, e.g. when the platform only allows audio after a
/// user gesture or no output device exists.
pub trait AudioHost {
    type Tap: SampleTap;

    fn open_tap(&mut self) -> Result<Self::Tap, AudioError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Waiting for the first user-initiated playback.
    Idle,
    Active,
    /// The host refused audio; frames stay at zero.
    Unavailable,
    /// Torn down; ticks are ignored.
    Closed,
}

pub struct AudioPipeline<H: AudioHost> {
    host: H,
    analyser: SpectrumAnalyser,
    channel: FrameChannel,
    tap: Option<H::Tap>,
    window: Vec<f32>,
    state: PipelineState,
}

impl<H: AudioHost> AudioPipeline<H> {
    pub fn new(host: H, channel: FrameChannel, config: AnalyserConfig) -> Result<Self, ConfigError> {
        let window = vec![0.0; config.fft_size];
        let analyser = SpectrumAnalyser::new(config)?;
        Ok(Self {
            host,
            analyser,
            channel,
            tap: None,
            window,
            state: PipelineState::Idle,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Start analysis. Call from the first user-initiated playback.
    ///
    /// Calling again while active returns [`AudioError::DuplicateInit`] and
    /// leaves the running pipeline untouched. A refused host yields
    /// [`AudioError::Unavailable`]; the pipeline then stays silent and a later
    /// `begin` may retry.
    pub fn begin(&mut self) -> Result<(), AudioError> {
        match self.state {
            PipelineState::Active => {
                log::debug!("[audio] begin ignored, pipeline already active");
                return Err(AudioError::DuplicateInit);
            }
            PipelineState::Closed => {
                return Err(AudioError::Unavailable("pipeline was torn down".into()));
            }
            PipelineState::Idle | PipelineState::Unavailable => {}
        }
        match self.host.open_tap() {
            Ok(tap) => {
                self.tap = Some(tap);
                self.state = PipelineState::Active;
                log::info!(
                    "[audio] analysis started fft_size={} bins={}",
                    self.analyser.config().fft_size,
                    self.analyser.config().bin_count()
                );
                Ok(())
            }
            Err(e) => {
                self.state = PipelineState::Unavailable;
                log::warn!("[audio] {e}; continuing without audio reactivity");
                Err(e)
            }
        }
    }

    /// Run one analysis tick and publish the resulting frame.
    ///
    /// Returns `None` without publishing when the pipeline is not active or the
    /// source has not yet filled a window.
    pub fn tick(&mut self) -> Option<AnalysisFrame> {
        if self.state != PipelineState::Active {
            return None;
        }
        let tap = self.tap.as_mut()?;
        if !tap.read_window(&mut self.window) {
            return None;
        }
        let frame = AnalysisFrame::from_bins(self.analyser.analyse(&self.window));
        self.channel.publish(frame);
        Some(frame)
    }

    /// Stop sampling and release the tap. Later ticks and begins do nothing.
    pub fn teardown(&mut self) {
        if self.state == PipelineState::Closed {
            return;
        }
        if let Some(mut tap) = self.tap.take() {
            tap.release();
        }
        self.analyser.reset();
        self.state = PipelineState::Closed;
        log::info!("[audio] analysis torn down");
    }
}

impl<H: AudioHost> Drop for AudioPipeline<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
