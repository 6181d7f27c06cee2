// Shared tuning constants for analysis, simulation and material response.
//
// Per-frame rates are expressed against a 60 Hz reference frame and scaled by
// the real elapsed time, so a throttled tier covers the same distance per
// second as an unthrottled one.

/// Duration of the reference frame that per-frame rates are tuned against.
pub const REFERENCE_FRAME_SEC: f32 = 1.0 / 60.0;

// Spectrum analysis
pub const FFT_SIZE: usize = 256; // 128 positive-frequency bins
pub const SPECTRUM_BINS: usize = FFT_SIZE / 2;
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;
/// Pause between analysis ticks on hosts that drive analysis from a worker.
pub const ANALYSIS_INTERVAL_MS: u64 = 16;

// Band partition (half-open bin ranges)
pub const LOW_BINS: (usize, usize) = (0, 8);
pub const MID_BINS: (usize, usize) = (8, 40);
pub const HIGH_BINS: (usize, usize) = (40, 80);

/// Upper bound of every band energy (8-bit magnitude scale).
pub const ENERGY_MAX: f32 = 255.0;

// Particle orbit generation
pub const PARTICLE_PHASE_MAX: f32 = 100.0;
pub const RADIUS_FACTOR_MIN: f32 = 20.0;
pub const RADIUS_FACTOR_SPAN: f32 = 100.0;
pub const SPEED_MIN: f32 = 0.01;
pub const SPEED_SPAN: f32 = 1.0 / 200.0;
pub const AXIS_FACTOR_HALF_SPAN: f32 = 50.0; // lateral factors in [-50, 50)

// Particle audio modulation (per reference frame)
pub const BASS_PHASE_ACCEL: f32 = 0.0001;
pub const BASS_DEPTH_PUSH: f32 = 0.1;
pub const MID_ROTATION_X: f32 = 0.0003;
pub const MID_ROTATION_Z: f32 = 0.00005;
pub const HIGH_SCALE_GAIN: f32 = 0.005;

// Tunnel recycling planes for the particle field (world units along +Z, the
// viewer sits on the +Z side)
pub const NEAR_PLANE_Z: f32 = 80.0;
pub const FAR_PLANE_Z: f32 = -100.0;

// Ambient star field
pub const STAR_SPREAD: f32 = 300.0; // lateral extent, stars in [-150, 150)
pub const STAR_NEAR_Z: f32 = 10.0;
pub const STAR_FAR_Z: f32 = -400.0;
pub const STAR_VELOCITY: f32 = 0.8; // depth units per reference frame
pub const STAR_ROTATION_SPEED: f32 = 0.0005; // radians per reference frame

// Camera sway (radians per second, world units per unit of mid energy)
pub const CAMERA_SWAY_FREQ: f32 = 0.1;
pub const CAMERA_SWAY_PER_MID: f32 = 0.02;

// Material baseline
pub const HUE_BASE: f32 = 0.7; // violet
pub const HUE_PER_HIGH: f32 = 0.00025;
pub const LIGHTNESS_BASE: f32 = 0.45;
pub const LIGHTNESS_PER_HIGH: f32 = 0.002;
pub const LIGHTNESS_MAX: f32 = 0.8;
pub const SATURATION: f32 = 1.0;
pub const OPACITY_BASE: f32 = 0.35;
pub const OPACITY_BREATH_SPAN: f32 = 0.5;

// Transient detection
pub const LOW_FLASH_THRESHOLD: f32 = 130.0;
pub const MID_FLASH_THRESHOLD: f32 = 150.0;
pub const FLASH_LIGHTNESS: f32 = 1.0;
pub const FLASH_OPACITY: f32 = 1.0;

// Haptics
pub const HAPTIC_COOLDOWN_MS: u64 = 150;
pub const HAPTIC_PULSE_MS: u64 = 20;

// Device tiers
pub const FULL_PARTICLE_COUNT: usize = 2000;
pub const CONSTRAINED_PARTICLE_COUNT: usize = 600;
pub const FULL_STAR_COUNT: usize = 1600;
pub const CONSTRAINED_MODULATION_HZ: f32 = 30.0;

// Post-processing defaults
pub const BLOOM_STRENGTH: f32 = 0.9;
pub const BLOOM_THRESHOLD: f32 = 0.6;
pub const CHROMATIC_OFFSET_PX: f32 = 1.5;
