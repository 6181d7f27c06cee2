//! Instanced warp particle field.
//!
//! Every particle follows a fixed Lissajous-style orbit driven by its own
//! phase and a clock shared by the whole field, which keeps the motion
//! coherent. Audio is layered on top: bass accelerates the phase and pushes
//! particles toward the viewer, mids spin them and highs swell them.

use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use rand::prelude::*;

use crate::constants::*;
use crate::frame::AnalysisFrame;
use crate::profile::DeviceProfile;

/// One element of the per-tick transform batch, laid out for direct upload
/// as an instance vertex buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub position: [f32; 3],
    pub scale: f32,
    /// Euler angles about X and Z, in radians.
    pub rotation: [f32; 2],
}

impl InstanceTransform {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_euler(EulerRot::XYZ, self.rotation[0], 0.0, self.rotation[1]),
            Vec3::from(self.position),
        )
    }
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub phase: f32,
    pub radius_factor: f32,
    pub speed: f32,
    pub x_factor: f32,
    pub y_factor: f32,
    pub z_factor: f32,
    /// Accumulated bass push along +Z.
    pub depth_drift: f32,
    pub rotation: Vec2,
}

impl Particle {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            phase: rng.gen::<f32>() * PARTICLE_PHASE_MAX,
            radius_factor: RADIUS_FACTOR_MIN + rng.gen::<f32>() * RADIUS_FACTOR_SPAN,
            speed: SPEED_MIN + rng.gen::<f32>() * SPEED_SPAN,
            x_factor: axis_factor(rng),
            y_factor: axis_factor(rng),
            z_factor: axis_factor(rng),
            depth_drift: 0.0,
            rotation: Vec2::ZERO,
        }
    }

    /// Orbit position at shared time `t`, before any bass push.
    pub fn base_position(&self, t: f32) -> Vec3 {
        let r = self.radius_factor;
        let a = t.cos() + self.phase.sin() / 10.0;
        let b = t.sin() + (self.phase * 2.0).cos() / 10.0;
        let slow = t / 10.0 * r;
        Vec3::new(
            self.x_factor + a + slow.cos() + t.sin() * r / 10.0,
            self.y_factor + b + slow.sin() + (t * 2.0).cos() * r / 10.0,
            self.z_factor + b + slow.cos() + (t * 3.0).sin() * r / 10.0,
        )
    }
}

#[inline]
fn axis_factor(rng: &mut StdRng) -> f32 {
    -AXIS_FACTOR_HALF_SPAN + rng.gen::<f32>() * AXIS_FACTOR_HALF_SPAN * 2.0
}

pub struct ParticleField {
    particles: Vec<Particle>,
    transforms: Vec<InstanceTransform>,
    rng: StdRng,
    throttle_secs: f32,
    since_modulation: f32,
    modulation: AnalysisFrame,
    recycled_last_tick: usize,
}

impl ParticleField {
    pub fn new(count: usize, throttle_secs: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let particles = (0..count)
            .map(|_| Particle::random(&mut rng))
            .collect::<Vec<_>>();
        Self {
            transforms: vec![InstanceTransform::default(); particles.len()],
            particles,
            rng,
            throttle_secs: throttle_secs.max(0.0),
            since_modulation: 0.0,
            modulation: AnalysisFrame::ZERO,
            recycled_last_tick: 0,
        }
    }

    pub fn from_profile(profile: &DeviceProfile, seed: u64) -> Self {
        Self::new(profile.particle_count, profile.update_throttle_secs, seed)
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    /// Frame the audio modulation currently uses. Lags the channel on
    /// throttled tiers.
    pub fn modulation_frame(&self) -> AnalysisFrame {
        self.modulation
    }

    pub fn recycled_last_tick(&self) -> usize {
        self.recycled_last_tick
    }

    /// Advance every particle by `dt_sec` and rewrite the transform batch.
    ///
    /// `elapsed_sec` is the shared orbit clock. `frame` must be the single
    /// snapshot read for this tick; it is adopted for modulation only when the
    /// throttle interval has elapsed.
    pub fn tick(&mut self, dt_sec: f32, elapsed_sec: f32, frame: &AnalysisFrame) -> &[InstanceTransform] {
        let dt = dt_sec.max(0.0);
        let frames = dt / REFERENCE_FRAME_SEC;

        self.since_modulation += dt;
        let modulate = self.throttle_secs <= 0.0 || self.since_modulation >= self.throttle_secs;
        let step = if modulate {
            self.modulation = *frame;
            let step = self.since_modulation / REFERENCE_FRAME_SEC;
            self.since_modulation = 0.0;
            step
        } else {
            0.0
        };

        let m = self.modulation;
        let scale = 1.0 + m.high * HIGH_SCALE_GAIN;
        let t = elapsed_sec;
        let mut recycled = 0;

        for (p, out) in self.particles.iter_mut().zip(self.transforms.iter_mut()) {
            p.phase += p.speed / 2.0 * frames;
            if modulate {
                p.phase += m.low * BASS_PHASE_ACCEL * step;
                p.depth_drift += m.low * BASS_DEPTH_PUSH * step;
                p.rotation.x += m.mid * MID_ROTATION_X * step;
                p.rotation.y += m.mid * MID_ROTATION_Z * step;
            }

            let mut pos = p.base_position(t);
            pos.z += p.depth_drift;
            if pos.z > NEAR_PLANE_Z {
                p.x_factor = axis_factor(&mut self.rng);
                p.y_factor = axis_factor(&mut self.rng);
                pos = p.base_position(t);
                // Re-anchor the drift so the orbit continues from the far plane.
                p.depth_drift = FAR_PLANE_Z - pos.z;
                pos.z = FAR_PLANE_Z;
                recycled += 1;
            }

            *out = InstanceTransform {
                position: pos.to_array(),
                scale,
                rotation: p.rotation.to_array(),
            };
        }

        self.recycled_last_tick = recycled;
        &self.transforms
    }
}
