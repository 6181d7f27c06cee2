//! The unit of audio state handed from analysis to rendering.

use crate::constants::{ENERGY_MAX, HIGH_BINS, LOW_BINS, MID_BINS};

/// Band energies for one sampling instant, each on the `0..=255` scale.
///
/// Frames are plain `Copy` values: a published frame is never edited, it is
/// only ever replaced wholesale.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnalysisFrame {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
    pub total: f32,
}

impl AnalysisFrame {
    pub const ZERO: AnalysisFrame = AnalysisFrame {
        low: 0.0,
        mid: 0.0,
        high: 0.0,
        total: 0.0,
    };

    pub fn new(low: f32, mid: f32, high: f32, total: f32) -> Self {
        Self {
            low,
            mid,
            high,
            total,
        }
        .clamped()
    }

    /// Build a frame from an 8-bit magnitude spectrum.
    ///
    /// Bands are the mean of bins `0..8`, `8..40` and `40..80`; `total` is the
    /// mean over every bin supplied. Bins missing from a short spectrum count
    /// as silence.
    pub fn from_bins(bins: &[u8]) -> Self {
        let total = if bins.is_empty() {
            0.0
        } else {
            bins.iter().map(|&b| b as f32).sum::<f32>() / bins.len() as f32
        };
        Self {
            low: band_mean(bins, LOW_BINS),
            mid: band_mean(bins, MID_BINS),
            high: band_mean(bins, HIGH_BINS),
            total,
        }
    }

    /// Copy with every field forced into `0..=255`; NaN becomes 0.
    pub fn clamped(self) -> Self {
        let c = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, ENERGY_MAX) };
        Self {
            low: c(self.low),
            mid: c(self.mid),
            high: c(self.high),
            total: c(self.total),
        }
    }
}

fn band_mean(bins: &[u8], (start, end): (usize, usize)) -> f32 {
    let width = end - start;
    let sum: u32 = bins
        .iter()
        .skip(start)
        .take(width)
        .map(|&b| b as u32)
        .sum();
    sum as f32 / width as f32
}
