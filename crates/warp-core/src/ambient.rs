//! Background star streaks. Independent of audio and of the particle field.

use glam::Vec3;
use rand::prelude::*;
use std::f32::consts::TAU;

use crate::constants::{
    REFERENCE_FRAME_SEC, STAR_FAR_Z, STAR_NEAR_Z, STAR_ROTATION_SPEED, STAR_SPREAD, STAR_VELOCITY,
};

pub struct AmbientField {
    stars: Vec<Vec3>,
    rotation: f32,
    rng: StdRng,
}

impl AmbientField {
    pub fn new(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let stars = (0..count)
            .map(|_| {
                let (x, y) = lateral(&mut rng);
                Vec3::new(x, y, rng.gen_range(STAR_FAR_Z..STAR_NEAR_Z))
            })
            .collect();
        Self {
            stars,
            rotation: 0.0,
            rng,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.stars
    }

    /// Rotation of the whole field about the depth axis, in `[0, TAU)`.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Stream every star toward the viewer; returns how many were recycled.
    pub fn tick(&mut self, dt_sec: f32) -> usize {
        let frames = dt_sec.max(0.0) / REFERENCE_FRAME_SEC;
        self.rotation = (self.rotation + STAR_ROTATION_SPEED * frames).rem_euclid(TAU);
        let dz = STAR_VELOCITY * frames;
        let mut recycled = 0;
        for star in &mut self.stars {
            star.z += dz;
            if star.z > STAR_NEAR_Z {
                let (x, y) = lateral(&mut self.rng);
                *star = Vec3::new(x, y, STAR_FAR_Z);
                recycled += 1;
            }
        }
        recycled
    }
}

fn lateral(rng: &mut StdRng) -> (f32, f32) {
    let half = STAR_SPREAD / 2.0;
    (rng.gen_range(-half..half), rng.gen_range(-half..half))
}
