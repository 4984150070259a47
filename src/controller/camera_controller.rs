use glam::Vec3;

use crate::config::CameraConfig;
use crate::controller::input::{InputProcessor, InputState};
use crate::model::{clamp_pitch, Camera};

/// Handles camera movement and orientation
#[derive(Debug, Clone)]
pub struct CameraController {
    /// World units per second.
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl CameraController {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            mouse_sensitivity: config.look_sensitivity,
        }
    }

    /// Apply pointer motion: yaw first, then pitch, then clamp.
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.yaw -= dx * self.mouse_sensitivity;
        camera.pitch = clamp_pitch(camera.pitch - dy * self.mouse_sensitivity);
    }

    /// Move along the ground-plane forward/right axes and straight up/down.
    /// Each held key contributes independently; diagonals are not normalised.
    pub fn update_movement(
        &self,
        camera: &mut Camera,
        input: &InputState,
        processor: &InputProcessor,
        dt: f32,
    ) {
        let step = self.move_speed * dt;
        let forward = camera.flat_forward();
        let right = camera.flat_right();

        let mut delta = Vec3::ZERO;
        if processor.is_moving_forward(input) {
            delta += forward;
        }
        if processor.is_moving_backward(input) {
            delta -= forward;
        }
        if processor.is_moving_right(input) {
            delta += right;
        }
        if processor.is_moving_left(input) {
            delta -= right;
        }
        if processor.is_rising(input) {
            delta += Vec3::Y;
        }
        if processor.is_sinking(input) {
            delta -= Vec3::Y;
        }

        camera.eye += delta * step;
    }
}
