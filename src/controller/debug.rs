//! Placement helpers: click logging, the debug marker and the gift report.

use glam::Vec3;

use crate::model::{Camera, ModelKind, Scene};

/// Render `p` as a config line that can be pasted into `workshop.toml`.
pub fn anchor_line(p: Vec3) -> String {
    format!("anchor = [{:.4}, {:.4}, {:.4}]", p.x, p.y, p.z)
}

pub fn log_camera(camera: &Camera) {
    let eye = camera.eye;
    tracing::info!(
        x = eye.x,
        y = eye.y,
        z = eye.z,
        yaw = camera.yaw,
        pitch = camera.pitch,
        "camera position"
    );
}

/// Remove any previous marker, then cast a ray through the screen centre and
/// drop a new one where it lands. A miss leaves no marker.
pub fn place_marker(camera: &Camera, scene: &mut Scene) -> Option<Vec3> {
    scene.clear_marker();
    let (origin, dir) = camera.center_ray();
    match scene.nearest_hit(origin, dir) {
        Some(hit) => {
            scene.place_marker(hit);
            tracing::info!(line = %anchor_line(hit), "marker placed");
            Some(hit)
        }
        None => {
            tracing::info!(origin = ?origin, dir = ?dir, "marker ray hit nothing");
            None
        }
    }
}

/// Log where the gift's visual centre currently is.
pub fn report_gift(scene: &Scene) -> Option<Vec3> {
    match scene.gift_visual_center() {
        Some(center) => {
            tracing::info!(
                line = %anchor_line(center),
                pivot = ?scene.gift_pivot_offset(),
                "gift visual centre"
            );
            Some(center)
        }
        None => {
            let slot = scene.slot(ModelKind::Gift);
            if slot.is_pending() {
                tracing::info!(asset = slot.label(), "gift still loading");
            } else {
                tracing::info!(asset = slot.label(), "gift not loaded");
            }
            None
        }
    }
}
