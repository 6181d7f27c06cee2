//! Session wiring: one device profile decides which layers exist, then each
//! render tick reads the channel once and drives them all from that frame.

use glam::Vec3;
use instant::Instant;
use std::time::Duration;

use crate::ambient::AmbientField;
use crate::channel::FrameChannel;
use crate::constants::{CAMERA_SWAY_FREQ, CAMERA_SWAY_PER_MID};
use crate::frame::AnalysisFrame;
use crate::particles::{InstanceTransform, ParticleField};
use crate::profile::{DeviceProfile, PostEffects};
use crate::response::{Haptics, MaterialState, ResponseLayer};

// A stalled window should not fling the field forward in one step.
const MAX_TICK_DT_SEC: f32 = 0.25;

/// Monotonic scene time, portable to wasm through `instant`.
pub struct SceneClock {
    start: Instant,
}

impl Default for SceneClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

pub struct StarLayer<'a> {
    pub positions: &'a [Vec3],
    pub rotation: f32,
}

/// Everything the renderer needs for one frame.
pub struct SceneFrame<'a> {
    pub frame: AnalysisFrame,
    pub particles: &'a [InstanceTransform],
    pub stars: Option<StarLayer<'a>>,
    pub material: MaterialState,
    pub post: Option<PostEffects>,
    /// Lateral camera offset; the camera keeps looking at the origin.
    pub camera_x: f32,
}

/// Side-to-side camera drift whose amplitude follows the mids.
pub fn camera_sway(time_sec: f32, mid: f32) -> f32 {
    (time_sec * CAMERA_SWAY_FREQ).sin() * mid * CAMERA_SWAY_PER_MID
}

pub struct Scene {
    channel: FrameChannel,
    particles: ParticleField,
    ambient: Option<AmbientField>,
    response: ResponseLayer,
    post: Option<PostEffects>,
    last_tick: Option<Duration>,
    torn_down: bool,
}

impl Scene {
    pub fn new(profile: DeviceProfile, channel: FrameChannel, seed: u64) -> Self {
        Self::with_haptics(profile, channel, seed, None)
    }

    /// `haptics` is only wired when the profile enables it.
    pub fn with_haptics(
        profile: DeviceProfile,
        channel: FrameChannel,
        seed: u64,
        haptics: Option<Box<dyn Haptics>>,
    ) -> Self {
        let particles = ParticleField::from_profile(&profile, seed);
        let ambient = profile
            .ambient_layer_enabled
            .then(|| AmbientField::new(profile.ambient_star_count, seed.wrapping_add(1)));
        let haptics = if profile.haptics_enabled { haptics } else { None };
        let post = profile.post_effects();
        log::info!(
            "[scene] tier={:?} particles={} throttle={:.3}s ambient={} post={} haptics={}",
            profile.tier,
            particles.particle_count(),
            profile.update_throttle_secs,
            ambient.is_some(),
            post.is_some(),
            haptics.is_some()
        );
        Self {
            response: ResponseLayer::new(haptics),
            channel,
            particles,
            ambient,
            post,
            last_tick: None,
            torn_down: false,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particles.particle_count()
    }

    pub fn ambient_enabled(&self) -> bool {
        self.ambient.is_some()
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Advance every layer to `now` (time since scene start).
    ///
    /// Returns `None` once the scene has been torn down.
    pub fn render_tick(&mut self, now: Duration) -> Option<SceneFrame<'_>> {
        if self.torn_down {
            return None;
        }
        let dt = self
            .last_tick
            .map_or(0.0, |last| now.saturating_sub(last).as_secs_f32())
            .min(MAX_TICK_DT_SEC);
        self.last_tick = Some(now);

        let frame = self.channel.latest();
        let time_sec = now.as_secs_f32();
        let material = self.response.tick(&frame, now);
        let particles = self.particles.tick(dt, time_sec, &frame);
        let stars = self.ambient.as_mut().map(|field| {
            field.tick(dt);
            StarLayer {
                positions: field.positions(),
                rotation: field.rotation(),
            }
        });

        Some(SceneFrame {
            frame,
            particles,
            stars,
            material,
            post: self.post,
            camera_x: camera_sway(time_sec, frame.mid),
        })
    }

    /// Stop ticking. Later render ticks return `None`.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.response.teardown();
        log::info!("[scene] torn down");
    }
}
