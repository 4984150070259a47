// VIEW: Model loading and rendering
pub mod gpu_init;
pub mod loader;
pub mod render;

pub use gpu_init::GpuContext;
pub use loader::{parse_model, ModelOptions};
pub use render::{CameraUniform, LightingUniform, ModelUniform, ParticleInstance, Renderer};
