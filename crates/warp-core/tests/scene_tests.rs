// Host-side tests for scene wiring and device tiers.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use warp_core::constants::*;
use warp_core::{
    camera_sway, AnalysisFrame, DeviceProfile, DeviceTier, FrameChannel, Haptics, HapticsError,
    MaterialState, Scene,
};

struct CountingHaptics(Rc<Cell<usize>>);

impl Haptics for CountingHaptics {
    fn pulse(&mut self, _duration: Duration) -> Result<(), HapticsError> {
        self.0.set(self.0.get() + 1);
        Ok(())
    }
}

fn frame_time(i: u64) -> Duration {
    Duration::from_micros(i * 16_667)
}

#[test]
fn constrained_tier_is_lighter() {
    let full = DeviceProfile::select(false);
    let constrained = DeviceProfile::select(true);
    assert_eq!(full.tier, DeviceTier::Full);
    assert_eq!(constrained.tier, DeviceTier::Constrained);
    assert!(constrained.particle_count < full.particle_count);
    assert!(constrained.update_throttle_secs > 0.0);
    assert!(constrained.post_effects().is_none());
    assert!(full.post_effects().is_some());

    let scene = Scene::new(constrained, FrameChannel::new(), 1);
    assert_eq!(scene.particle_count(), CONSTRAINED_PARTICLE_COUNT);
    assert!(!scene.ambient_enabled());
}

#[test]
fn full_tier_renders_every_layer() {
    let mut scene = Scene::new(DeviceProfile::full(), FrameChannel::new(), 2);
    let out = scene.render_tick(frame_time(0)).unwrap();
    assert_eq!(out.particles.len(), FULL_PARTICLE_COUNT);
    let stars = out.stars.expect("full tier draws the ambient layer");
    assert_eq!(stars.positions.len(), FULL_STAR_COUNT);
    assert!(out.post.is_some());
}

#[test]
fn silence_keeps_baseline_without_flash_or_pulses() {
    let pulses = Rc::new(Cell::new(0));
    let mut scene = Scene::with_haptics(
        DeviceProfile::constrained(),
        FrameChannel::new(),
        3,
        Some(Box::new(CountingHaptics(Rc::clone(&pulses)))),
    );
    for i in 0..120 {
        let out = scene.render_tick(frame_time(i)).unwrap();
        assert_eq!(out.frame, AnalysisFrame::ZERO);
        assert_eq!(out.material, MaterialState::BASELINE);
    }
    assert_eq!(pulses.get(), 0);
    for t in scene.particles().transforms() {
        assert_eq!(t.scale, 1.0);
    }
}

#[test]
fn published_frame_drives_the_tick() {
    let channel = FrameChannel::new();
    let mut scene = Scene::new(DeviceProfile::full(), channel.clone(), 4);
    scene.render_tick(frame_time(0));
    channel.publish(AnalysisFrame::new(0.0, 200.0, 40.0, 60.0));
    let out = scene.render_tick(frame_time(1)).unwrap();
    assert_eq!(out.frame.mid, 200.0);
    assert!(out.material.flash_active);
    assert!((out.particles[0].scale - 1.2).abs() < 1e-6);
}

#[test]
fn kicks_pulse_only_on_haptic_tiers() {
    let kick = AnalysisFrame::new(220.0, 0.0, 0.0, 50.0);
    for (profile, expected) in [(DeviceProfile::constrained(), 1), (DeviceProfile::full(), 0)] {
        let pulses = Rc::new(Cell::new(0));
        let channel = FrameChannel::new();
        let mut scene = Scene::with_haptics(
            profile,
            channel.clone(),
            5,
            Some(Box::new(CountingHaptics(Rc::clone(&pulses)))),
        );
        channel.publish(kick);
        // Five ticks span well under the cool-down.
        for i in 0..5 {
            scene.render_tick(frame_time(i));
        }
        assert_eq!(pulses.get(), expected);
    }
}

#[test]
fn render_tick_after_teardown_is_a_no_op() {
    let mut scene = Scene::new(DeviceProfile::full(), FrameChannel::new(), 6);
    assert!(scene.render_tick(frame_time(0)).is_some());
    scene.teardown();
    assert!(scene.is_torn_down());
    assert!(scene.render_tick(frame_time(1)).is_none());
    scene.teardown();
}

#[test]
fn long_stall_is_clamped() {
    let channel = FrameChannel::new();
    let mut scene = Scene::new(DeviceProfile::full(), channel.clone(), 7);
    scene.render_tick(Duration::ZERO);
    let before: Vec<f32> = scene.particles().particles().iter().map(|p| p.phase).collect();
    scene.render_tick(Duration::from_secs(30));
    for (p, old) in scene.particles().particles().iter().zip(before) {
        // The 0.25 s cap allows at most 15 reference frames of baseline advance.
        assert!(p.phase - old <= 15.0 * (SPEED_MIN + SPEED_SPAN) / 2.0 + 1e-4);
    }
}

#[test]
fn camera_sways_with_the_mids_only() {
    let channel = FrameChannel::new();
    let mut scene = Scene::new(DeviceProfile::full(), channel.clone(), 8);
    let at = Duration::from_secs(5);
    let still = scene.render_tick(at).unwrap();
    assert_eq!(still.camera_x, 0.0);

    channel.publish(AnalysisFrame::new(0.0, 100.0, 0.0, 40.0));
    let later = at + Duration::from_millis(16);
    let swaying = scene.render_tick(later).unwrap();
    assert!(swaying.camera_x.abs() > 0.5);
    assert!((swaying.camera_x - camera_sway(later.as_secs_f32(), 100.0)).abs() < 1e-5);

    // sin(0.5) * 100 * 0.02
    assert!((camera_sway(5.0, 100.0) - 0.958_851).abs() < 1e-4);
    assert_eq!(camera_sway(5.0, 0.0), 0.0);
    assert!(camera_sway(0.0, 255.0).abs() < 1e-6);
}
