//! Shared material reaction to the audio frame: baseline color drift, flash on
//! transients and a debounced haptic pulse.

use std::time::Duration;

use crate::constants::*;
use crate::error::HapticsError;
use crate::frame::AnalysisFrame;

/// Host vibration capability.
pub trait Haptics {
    fn pulse(&mut self, duration: Duration) -> Result<(), HapticsError>;
}

/// Haptics sink for hosts with no vibration motor.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&mut self, _duration: Duration) -> Result<(), HapticsError> {
        Err(HapticsError::Unsupported)
    }
}

/// Material parameters shared by every instance of the particle field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialState {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
    pub opacity: f32,
    pub flash_active: bool,
}

impl MaterialState {
    /// Material for a silent frame.
    pub const BASELINE: MaterialState = MaterialState {
        hue: HUE_BASE,
        saturation: SATURATION,
        lightness: LIGHTNESS_BASE,
        opacity: OPACITY_BASE,
        flash_active: false,
    };

    /// Linear RGB from HSL, with opacity in alpha.
    pub fn to_rgba(&self) -> [f32; 4] {
        let [r, g, b] = hsl_to_rgb(self.hue, self.saturation, self.lightness);
        [r, g, b, self.opacity]
    }
}

impl Default for MaterialState {
    fn default() -> Self {
        Self::BASELINE
    }
}

/// Map a frame to material state, ignoring haptics.
pub fn material_for(frame: &AnalysisFrame) -> MaterialState {
    if is_transient(frame) {
        return MaterialState {
            hue: baseline_hue(frame.high),
            saturation: SATURATION,
            lightness: FLASH_LIGHTNESS,
            opacity: FLASH_OPACITY,
            flash_active: true,
        };
    }
    MaterialState {
        hue: baseline_hue(frame.high),
        saturation: SATURATION,
        lightness: (LIGHTNESS_BASE + frame.high * LIGHTNESS_PER_HIGH).min(LIGHTNESS_MAX),
        opacity: (OPACITY_BASE + frame.total / ENERGY_MAX * OPACITY_BREATH_SPAN).clamp(0.0, 1.0),
        flash_active: false,
    }
}

/// Kick or snare: either band beyond its flash threshold.
pub fn is_transient(frame: &AnalysisFrame) -> bool {
    frame.low > LOW_FLASH_THRESHOLD || frame.mid > MID_FLASH_THRESHOLD
}

#[inline]
fn baseline_hue(high: f32) -> f32 {
    (HUE_BASE + high * HUE_PER_HIGH).rem_euclid(1.0)
}

pub struct ResponseLayer {
    material: MaterialState,
    haptics: Option<Box<dyn Haptics>>,
    cooldown: Duration,
    last_pulse: Option<Duration>,
    pulses_fired: u64,
}

impl ResponseLayer {
    /// `haptics` is `None` on tiers that never vibrate.
    pub fn new(haptics: Option<Box<dyn Haptics>>) -> Self {
        Self {
            material: MaterialState::BASELINE,
            haptics,
            cooldown: Duration::from_millis(HAPTIC_COOLDOWN_MS),
            last_pulse: None,
            pulses_fired: 0,
        }
    }

    pub fn material(&self) -> MaterialState {
        self.material
    }

    pub fn pulses_fired(&self) -> u64 {
        self.pulses_fired
    }

    /// Derive this tick's material from `frame` and fire a haptic pulse on a
    /// bass hit if the cool-down has passed. `now` is time since scene start.
    pub fn tick(&mut self, frame: &AnalysisFrame, now: Duration) -> MaterialState {
        self.material = material_for(frame);
        if frame.low > LOW_FLASH_THRESHOLD {
            self.try_pulse(now);
        }
        self.material
    }

    fn try_pulse(&mut self, now: Duration) {
        let Some(haptics) = self.haptics.as_mut() else {
            return;
        };
        let ready = self
            .last_pulse
            .map_or(true, |last| now.saturating_sub(last) >= self.cooldown);
        if !ready {
            log::trace!("[haptics] pulse skipped, cooling down");
            return;
        }
        self.last_pulse = Some(now);
        match haptics.pulse(Duration::from_millis(HAPTIC_PULSE_MS)) {
            Ok(()) => self.pulses_fired += 1,
            Err(HapticsError::Unsupported) => {}
        }
    }

    /// Reset the cool-down and material; the haptics sink is kept.
    pub fn teardown(&mut self) {
        self.last_pulse = None;
        self.material = MaterialState::BASELINE;
    }
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s <= 0.0 {
        return [l, l, l];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_channel(p, q, h + 1.0 / 3.0),
        hue_channel(p, q, h),
        hue_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_primaries() {
        let red = hsl_to_rgb(0.0, 1.0, 0.5);
        assert!((red[0] - 1.0).abs() < 1e-6 && red[1].abs() < 1e-6 && red[2].abs() < 1e-6);
        let white = hsl_to_rgb(0.7, 1.0, 1.0);
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));
    }

    #[test]
    fn baseline_violet_is_blue_dominant() {
        let [r, g, b, a] = MaterialState::BASELINE.to_rgba();
        assert!(b > r && r > g, "violet expected, got {r} {g} {b}");
        assert_eq!(a, OPACITY_BASE);
    }

    #[test]
    fn lightness_is_capped() {
        let m = material_for(&AnalysisFrame::new(0.0, 0.0, 255.0, 0.0));
        assert_eq!(m.lightness, LIGHTNESS_MAX);
        assert!(!m.flash_active);
    }
}
