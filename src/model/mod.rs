// MODEL: Scene data, camera and effect state
pub mod animation;
pub mod asset;
pub mod camera;
pub mod hud;
pub mod particles;
pub mod scene;

pub use animation::{ScalarAnimation, ScalarAnimations, ScalarTarget, SmoothMove};
pub use asset::AssetSlot;
pub use camera::{clamp_pitch, Camera, PITCH_LIMIT};
pub use hud::HudState;
pub use particles::{ParticleEffect, ParticlePool};
pub use scene::{LoadedModel, ModelKind, Scene, SceneModel, Shading};
