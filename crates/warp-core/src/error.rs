use thiserror::Error;

/// Failures raised while bringing up or running the audio pipeline.
///
/// None of these are fatal to rendering: the engine keeps drawing with the
/// zero frame when audio cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// The host refused to create an audio context or the source could not be tapped.
    #[error("audio unavailable: {0}")]
    Unavailable(String),
    /// `begin` was called while the pipeline was already running; nothing changed.
    #[error("audio pipeline is already active")]
    DuplicateInit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HapticsError {
    #[error("haptics are not supported by this host")]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("fft size must be a power of two of at least 32, got {0}")]
    InvalidFftSize(usize),
    #[error("decibel range is empty: min {min} must be below max {max}")]
    InvalidDecibelRange { min: f32, max: f32 },
    #[error("smoothing time constant must be in [0, 1), got {0}")]
    InvalidSmoothing(f32),
}
