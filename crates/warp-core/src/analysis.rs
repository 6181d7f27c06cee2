//! Byte magnitude spectrum in the style of a Web Audio `AnalyserNode`.
//!
//! One call to [`SpectrumAnalyser::analyse`] turns a window of time-domain
//! samples into `fft_size / 2` bytes: Blackman window, FFT, magnitude scaled by
//! `1/N`, temporal smoothing against the previous call, then a linear map of
//! the `[min_decibels, max_decibels]` range onto `0..=255`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::constants::{FFT_SIZE, MAX_DECIBELS, MIN_DECIBELS, SMOOTHING_TIME_CONSTANT};
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// Transform length, power of two. 256 gives 128 bins.
    pub fft_size: usize,
    /// Weight of the previous magnitude in `[0, 1)`; 0 disables smoothing.
    pub smoothing_time_constant: f32,
    /// Level mapped to byte 0.
    pub min_decibels: f32,
    /// Level mapped to byte 255.
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: FFT_SIZE,
            smoothing_time_constant: SMOOTHING_TIME_CONSTANT,
            min_decibels: MIN_DECIBELS,
            max_decibels: MAX_DECIBELS,
        }
    }
}

impl AnalyserConfig {
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(ConfigError::InvalidFftSize(self.fft_size));
        }
        if !(self.min_decibels < self.max_decibels) {
            return Err(ConfigError::InvalidDecibelRange {
                min: self.min_decibels,
                max: self.max_decibels,
            });
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(ConfigError::InvalidSmoothing(self.smoothing_time_constant));
        }
        Ok(())
    }
}

pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl SpectrumAnalyser {
    pub fn new(config: AnalyserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(n);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Ok(Self {
            window: (0..n).map(|i| blackman(i, n)).collect(),
            buffer: vec![Complex::new(0.0, 0.0); n],
            scratch,
            smoothed: vec![0.0; n / 2],
            bytes: vec![0; n / 2],
            fft,
            config,
        })
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    /// Analyse the newest `fft_size` samples of `samples` and return the byte
    /// spectrum. Shorter input is zero-padded at the front.
    pub fn analyse(&mut self, samples: &[f32]) -> &[u8] {
        let n = self.config.fft_size;
        let take = samples.len().min(n);
        let pad = n - take;
        let recent = &samples[samples.len() - take..];
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { recent[i - pad] };
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let tau = self.config.smoothing_time_constant;
        let min_db = self.config.min_decibels;
        let range_scale = 255.0 / (self.config.max_decibels - min_db);
        let inv_n = 1.0 / n as f32;
        for k in 0..n / 2 {
            let magnitude = self.buffer[k].norm() * inv_n;
            let s = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            // Keep the smoothing state finite if a sample burst produced NaN.
            self.smoothed[k] = if s.is_finite() { s } else { 0.0 };
            self.bytes[k] = to_byte(self.smoothed[k], min_db, range_scale);
        }
        &self.bytes
    }

    /// Forget smoothing history, as if no audio had been analysed.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.bytes.fill(0);
    }
}

#[inline]
fn to_byte(magnitude: f32, min_db: f32, range_scale: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    ((db - min_db) * range_scale).clamp(0.0, 255.0) as u8
}

/// Blackman window (alpha = 0.16).
fn blackman(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}
