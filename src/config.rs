use std::path::Path;

use glam::Vec3;
use serde::Deserialize;

use crate::controller::input::KeyBindings;
use crate::error::ViewerError;

/// Environment variable naming an alternative config file (native only).
pub const CONFIG_ENV: &str = "WORKSHOP_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "workshop.toml";

/// All tunables of the viewer. Every section falls back to its defaults, so a
/// config file only needs to name what it changes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub reveal: RevealConfig,
    pub particles: ParticleConfig,
    pub keys: KeyBindings,
}

impl ViewerConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ViewerError> {
        Ok(toml::from_str(src)?)
    }

    /// Load from `path`; a missing file is not an error and yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ViewerError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(src) => {
                tracing::info!(path = %path.display(), "loaded config");
                Self::from_toml_str(&src)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from `$WORKSHOP_CONFIG` or `workshop.toml` in the working directory.
    pub fn load_default_location() -> Result<Self, ViewerError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub start_position: [f32; 3],
    /// World units per second.
    pub move_speed: f32,
    /// Radians per pixel of pointer motion.
    pub look_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            z_near: 0.1,
            z_far: 1000.0,
            start_position: [0.0, 1.6, 9.0],
            move_speed: 0.6,
            look_sensitivity: 0.002,
        }
    }
}

impl CameraConfig {
    pub fn start_position(&self) -> Vec3 {
        Vec3::from_array(self.start_position)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub machine_path: String,
    pub gift_path: String,
    pub pop_sound_path: String,
    /// Where the gift's visual centre lands once revealed.
    pub anchor: [f32; 3],
    pub trigger_distance: f32,
    /// 0xRRGGBB
    pub background: u32,
    pub machine_emissive: f32,
    pub ambient_intensity: f32,
    pub hemisphere_intensity: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            machine_path: "assets/bridgeport.glb".to_string(),
            gift_path: "assets/gift_tag.glb".to_string(),
            pop_sound_path: "pop.mp3".to_string(),
            anchor: [-0.3778, 1.82, 0.7092],
            trigger_distance: 4.0,
            background: 0xF0EFE7,
            machine_emissive: 0.25,
            ambient_intensity: 1.5,
            hemisphere_intensity: 1.2,
        }
    }
}

impl SceneConfig {
    pub fn anchor(&self) -> Vec3 {
        Vec3::from_array(self.anchor)
    }

    pub fn background_rgb(&self) -> [f64; 3] {
        let c = self.background;
        [
            ((c >> 16) & 0xff) as f64 / 255.0,
            ((c >> 8) & 0xff) as f64 / 255.0,
            (c & 0xff) as f64 / 255.0,
        ]
    }
}

/// How an animation's progress advances each rendered frame.
///
/// `PerFrame` adds a fixed step every frame, so the animation speed depends on
/// the display refresh rate. `PerSecond` scales by the frame's elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnimationClock {
    PerFrame { step: f32 },
    PerSecond { rate: f32 },
}

impl AnimationClock {
    pub fn step(&self, dt: f32) -> f32 {
        match *self {
            AnimationClock::PerFrame { step } => step,
            AnimationClock::PerSecond { rate } => rate * dt.max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub view_distance: f32,
    pub view_height_offset: f32,
    pub camera_clock: AnimationClock,
    pub scale_clock: AnimationClock,
    pub initial_scale: f32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            view_distance: 1.28,
            view_height_offset: 0.42,
            camera_clock: AnimationClock::PerFrame { step: 0.02 },
            scale_clock: AnimationClock::PerFrame { step: 0.05 },
            initial_scale: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    /// Radius of the disc particles start in.
    pub radius: f32,
    /// Upper bound of the random initial lift.
    pub lift: f32,
    /// Outward velocity per unit of initial offset.
    pub spread: f32,
    pub rise_min: f32,
    pub rise_jitter: f32,
    /// Seconds.
    pub duration: f32,
    pub size: f32,
    pub size_growth: f32,
    pub opacity: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 60,
            radius: 0.12,
            lift: 0.06,
            spread: 1.2,
            rise_min: 0.35,
            rise_jitter: 0.45,
            duration: 0.8,
            size: 0.12,
            size_growth: 0.08,
            opacity: 0.6,
        }
    }
}
