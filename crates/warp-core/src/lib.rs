//! Platform-independent core of the warp field visualizer.
//!
//! Nothing in here touches an audio device or a GPU. Front-ends implement
//! [`AudioHost`]/[`SampleTap`] for their audio stack and [`Haptics`] for their
//! vibration API, then feed [`SceneFrame`]s to their renderer.

pub mod ambient;
pub mod analysis;
pub mod channel;
pub mod constants;
pub mod error;
pub mod frame;
pub mod particles;
pub mod pipeline;
pub mod profile;
pub mod response;
pub mod scene;

pub use ambient::AmbientField;
pub use analysis::{AnalyserConfig, SpectrumAnalyser};
pub use channel::FrameChannel;
pub use error::{AudioError, ConfigError, HapticsError};
pub use frame::AnalysisFrame;
pub use particles::{InstanceTransform, Particle, ParticleField};
pub use pipeline::{AudioHost, AudioPipeline, PipelineState, SampleTap};
pub use profile::{DeviceProfile, DeviceTier, PostEffects};
pub use response::{is_transient, material_for, Haptics, MaterialState, NoHaptics, ResponseLayer};
pub use scene::{camera_sway, Scene, SceneClock, SceneFrame, StarLayer};
