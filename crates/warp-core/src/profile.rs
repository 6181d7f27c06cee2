//! Session-wide quality tier, chosen once from the host's "constrained" signal.

use crate::constants::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceTier {
    Full,
    Constrained,
}

/// Every knob that differs between device tiers.
///
/// Layers read their settings from here instead of branching on the tier.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceProfile {
    pub tier: DeviceTier,
    pub particle_count: usize,
    /// Minimum seconds between audio-modulation passes; 0 runs every tick.
    pub update_throttle_secs: f32,
    pub post_effects_enabled: bool,
    pub ambient_layer_enabled: bool,
    pub ambient_star_count: usize,
    /// Constrained tiers are the mobile ones, the only ones that vibrate.
    pub haptics_enabled: bool,
}

impl DeviceProfile {
    pub fn select(constrained: bool) -> Self {
        if constrained {
            Self::constrained()
        } else {
            Self::full()
        }
    }

    pub fn full() -> Self {
        Self {
            tier: DeviceTier::Full,
            particle_count: FULL_PARTICLE_COUNT,
            update_throttle_secs: 0.0,
            post_effects_enabled: true,
            ambient_layer_enabled: true,
            ambient_star_count: FULL_STAR_COUNT,
            haptics_enabled: false,
        }
    }

    pub fn constrained() -> Self {
        Self {
            tier: DeviceTier::Constrained,
            particle_count: CONSTRAINED_PARTICLE_COUNT,
            update_throttle_secs: 1.0 / CONSTRAINED_MODULATION_HZ,
            post_effects_enabled: false,
            ambient_layer_enabled: false,
            ambient_star_count: 0,
            haptics_enabled: true,
        }
    }

    pub fn post_effects(&self) -> Option<PostEffects> {
        self.post_effects_enabled.then(PostEffects::default)
    }
}

/// Bloom and chromatic aberration settings for the post pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostEffects {
    pub bloom_strength: f32,
    pub bloom_threshold: f32,
    pub chromatic_offset_px: f32,
}

impl Default for PostEffects {
    fn default() -> Self {
        Self {
            bloom_strength: BLOOM_STRENGTH,
            bloom_threshold: BLOOM_THRESHOLD,
            chromatic_offset_px: CHROMATIC_OFFSET_PX,
        }
    }
}
