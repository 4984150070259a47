use glam::Vec3;

use crate::model::HudState;

/// Whether the player is close enough to interact. Always false once the
/// reveal has been spent.
pub fn evaluate(camera: Vec3, anchor: Vec3, threshold: f32, already_revealed: bool) -> bool {
    !already_revealed && camera.distance(anchor) < threshold
}

/// Per-frame proximity check that also drives the interaction prompt.
#[derive(Debug, Clone)]
pub struct ProximityTrigger {
    pub threshold: f32,
    interactable: bool,
}

impl ProximityTrigger {
    pub fn new(threshold: f32) -> Self {
        Self { threshold, interactable: false }
    }

    pub fn is_interactable(&self) -> bool {
        self.interactable
    }

    pub fn update(&mut self, camera: Vec3, anchor: Vec3, already_revealed: bool, hud: &mut HudState) -> bool {
        self.interactable = evaluate(camera, anchor, self.threshold, already_revealed);
        hud.set_prompt(self.interactable);
        self.interactable
    }

    /// Drop the flag without re-evaluating, e.g. while the anchor's model is
    /// not loaded.
    pub fn reset(&mut self, hud: &mut HudState) {
        self.interactable = false;
        hud.set_prompt(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANCHOR: Vec3 = Vec3::new(-0.3778, 1.82, 0.7092);

    #[test]
    fn camera_behind_anchor_is_in_range() {
        let camera = ANCHOR + Vec3::new(0.0, 0.0, 3.0);
        assert!(evaluate(camera, ANCHOR, 4.0, false));
        assert!(!evaluate(camera, ANCHOR, 4.0, true));
    }

    #[test]
    fn threshold_is_strict() {
        let anchor = Vec3::new(1.0, 2.0, 0.0);
        let camera = anchor + Vec3::new(4.0, 0.0, 0.0);
        assert!(!evaluate(camera, anchor, 4.0, false));
        assert!(evaluate(camera, anchor, 4.001, false));
    }

    #[test]
    fn update_toggles_prompt() {
        let mut trigger = ProximityTrigger::new(4.0);
        let mut hud = HudState::default();

        assert!(trigger.update(ANCHOR + Vec3::Z, ANCHOR, false, &mut hud));
        assert!(hud.prompt_visible);

        assert!(!trigger.update(ANCHOR + Vec3::Z * 10.0, ANCHOR, false, &mut hud));
        assert!(!hud.prompt_visible);

        trigger.update(ANCHOR, ANCHOR, false, &mut hud);
        trigger.reset(&mut hud);
        assert!(!trigger.is_interactable());
        assert!(!hud.prompt_visible);
    }
}
