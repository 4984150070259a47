use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Closest the camera may look towards straight up or down. The limit itself
/// is reachable, as look input saturates onto it.
pub const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.1;

/// Below this squared length a look direction is treated as degenerate.
const MIN_LOOK_LENGTH_SQ: f32 = 1e-6;

/// Clamp pitch into `[-PITCH_LIMIT, PITCH_LIMIT]`. NaN collapses to level.
pub fn clamp_pitch(pitch: f32) -> f32 {
    if pitch.is_nan() {
        return 0.0;
    }
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}

/// First-person camera. Yaw rotates about +Y and is applied before pitch, so
/// the camera never rolls. Yaw 0 looks down -Z.
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_config(&CameraConfig::default(), width, height)
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self {
            eye: config.start_position(),
            yaw: 0.0,
            pitch: 0.0,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: config.z_near,
            z_far: config.z_far,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    /// Forward projected onto the ground plane (unit length).
    pub fn flat_forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(-sy, 0.0, -cy)
    }

    /// Right-hand direction on the ground plane (unit length).
    pub fn flat_right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, 0.0, -sy)
    }

    /// Screen-space right and up axes in world space, for billboards.
    pub fn billboard_axes(&self) -> (Vec3, Vec3) {
        let right = self.flat_right();
        let up = right.cross(self.forward()).normalize_or_zero();
        (right, up)
    }

    pub fn target(&self) -> Vec3 { self.eye + self.forward() }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target(), Vec3::Y);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }

    /// Turn to face `target` from the current eye position.
    ///
    /// Returns false and leaves the orientation untouched when the eye
    /// coincides with the target.
    pub fn set_look_at(&mut self, target: Vec3) -> bool {
        let dir = target - self.eye;
        if dir.length_squared() <= MIN_LOOK_LENGTH_SQ {
            return false;
        }
        let dir = dir.normalize();
        self.yaw = (-dir.x).atan2(-dir.z);
        self.pitch = clamp_pitch(dir.y.clamp(-1.0, 1.0).asin());
        true
    }

    /// Ray through the centre of the screen.
    pub fn center_ray(&self) -> (Vec3, Vec3) {
        (self.eye, self.forward())
    }
}
