//! One-shot reveal of the hidden gift.
//!
//! `Idle -> Armed -> Animating -> Done`, never backwards. Armed is entered the
//! first time the player walks into range and stays set; the interaction key
//! only fires while the proximity trigger is also active.

use glam::Vec3;

use crate::config::RevealConfig;
use crate::model::{
    Camera, ModelKind, ParticlePool, ScalarAnimation, ScalarAnimations, ScalarTarget, Scene, SmoothMove,
};

/// Squared length below which the anchor->camera offset counts as vertical.
const MIN_HORIZONTAL_LENGTH_SQ: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RevealState {
    Idle,
    Armed,
    Animating,
    Done,
}

/// Why an interaction press did not start the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRefusal {
    OutOfRange,
    AlreadyRevealed,
    GiftNotLoaded,
}

/// Unit direction from the anchor towards the camera on the ground plane,
/// or +Z when the camera is directly above or below the anchor.
pub fn horizontal_offset_dir(anchor: Vec3, camera: Vec3) -> Vec3 {
    let offset = Vec3::new(camera.x - anchor.x, 0.0, camera.z - anchor.z);
    if offset.length_squared() < MIN_HORIZONTAL_LENGTH_SQ {
        return Vec3::Z;
    }
    offset.normalize()
}

/// Camera position from which the revealed gift is viewed.
pub fn view_target(anchor: Vec3, camera: Vec3, view_distance: f32, height_offset: f32) -> Vec3 {
    let mut target = anchor + horizontal_offset_dir(anchor, camera) * view_distance;
    target.y = anchor.y + height_offset;
    target
}

pub struct RevealSequencer {
    config: RevealConfig,
    state: RevealState,
    smooth_move: Option<SmoothMove>,
    look_target: Option<Vec3>,
}

impl RevealSequencer {
    pub fn new(config: RevealConfig) -> Self {
        Self { config, state: RevealState::Idle, smooth_move: None, look_target: None }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    /// True once the reveal has started; the proximity trigger stays off after.
    pub fn is_spent(&self) -> bool {
        self.state >= RevealState::Animating
    }

    pub fn smooth_move(&self) -> Option<&SmoothMove> {
        self.smooth_move.as_ref()
    }

    fn advance_to(&mut self, next: RevealState) {
        debug_assert!(next >= self.state);
        if next > self.state {
            tracing::info!(from = ?self.state, to = ?next, "reveal state");
            self.state = next;
        }
    }

    /// Called when the proximity trigger reports the player in range.
    pub fn arm(&mut self) {
        if self.state == RevealState::Idle {
            self.advance_to(RevealState::Armed);
        }
    }

    /// Handle an interaction press. On success the camera move, the gift
    /// scale-in and the particle puff are all started.
    pub fn try_trigger(
        &mut self,
        interactable: bool,
        camera: &Camera,
        scene: &mut Scene,
        particles: &mut ParticlePool,
        animations: &mut ScalarAnimations,
        dt: f32,
    ) -> Result<(), TriggerRefusal> {
        if self.is_spent() {
            return Err(TriggerRefusal::AlreadyRevealed);
        }
        if !interactable || self.state != RevealState::Armed {
            return Err(TriggerRefusal::OutOfRange);
        }
        if !scene.is_ready(ModelKind::Gift) {
            let slot = scene.slot(ModelKind::Gift);
            if slot.has_failed() {
                tracing::error!(asset = slot.label(), "gift model failed to load, reveal aborted");
            } else {
                tracing::error!(asset = slot.label(), "gift model not loaded yet, reveal aborted");
            }
            return Err(TriggerRefusal::GiftNotLoaded);
        }

        let anchor = scene.anchor();
        let end = view_target(anchor, camera.eye, self.config.view_distance, self.config.view_height_offset);
        self.smooth_move = Some(SmoothMove::new(camera.eye, end));
        self.look_target = Some(anchor);
        self.advance_to(RevealState::Animating);

        scene.show_gift_at_anchor(self.config.initial_scale);
        particles.spawn(anchor);
        let scale = animations.start(
            ScalarAnimation {
                target: ScalarTarget::GiftScale,
                value: self.config.initial_scale,
                end: 1.0,
                clock: self.config.scale_clock,
            },
            dt,
        );
        scene.set_gift_scale(scale);

        tracing::info!(
            anchor = ?anchor,
            camera = ?camera.eye,
            target = ?end,
            "gift revealed"
        );
        Ok(())
    }

    /// Per-frame camera smoothing. Moves the camera along the smooth move and
    /// keeps it facing the anchor from wherever it currently is.
    pub fn update(&mut self, camera: &mut Camera, animations: &ScalarAnimations, dt: f32) {
        if self.state != RevealState::Animating {
            return;
        }

        if let Some(mv) = self.smooth_move.as_mut() {
            camera.eye = mv.advance(self.config.camera_clock.step(dt));
            if mv.is_finished() {
                self.smooth_move = None;
            }
        }

        if let Some(target) = self.look_target {
            // coincident eye and target leave the orientation as is
            camera.set_look_at(target);
            if self.smooth_move.is_none() {
                self.look_target = None;
            }
        }

        if self.smooth_move.is_none() && !animations.is_active(ScalarTarget::GiftScale) {
            self.advance_to(RevealState::Done);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnimationClock, ParticleConfig};
    use crate::error::ViewerError;
    use crate::model::scene::tests::cube_model;
    use crate::model::Shading;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ANCHOR: Vec3 = Vec3::new(-0.3778, 1.82, 0.7092);

    struct Rig {
        camera: Camera,
        scene: Scene,
        particles: ParticlePool,
        animations: ScalarAnimations,
        reveal: RevealSequencer,
    }

    fn rig(gift_loaded: bool) -> Rig {
        let mut scene = Scene::new(ANCHOR);
        if gift_loaded {
            scene.install(ModelKind::Gift, cube_model("gift", 0.2, Vec3::new(0.1, 0.05, 0.0), Shading::Unlit));
        }
        let mut camera = Camera::new(800, 600);
        camera.eye = ANCHOR + Vec3::new(0.0, 0.0, 3.0);
        Rig {
            camera,
            scene,
            particles: ParticlePool::with_rng(ParticleConfig::default(), StdRng::seed_from_u64(1)),
            animations: ScalarAnimations::new(),
            reveal: RevealSequencer::new(RevealConfig::default()),
        }
    }

    impl Rig {
        fn press(&mut self, interactable: bool) -> Result<(), TriggerRefusal> {
            self.reveal.try_trigger(
                interactable,
                &self.camera,
                &mut self.scene,
                &mut self.particles,
                &mut self.animations,
                1.0 / 60.0,
            )
        }

        fn frame(&mut self) {
            let scene = &mut self.scene;
            self.animations.advance(1.0 / 60.0, |target, value| match target {
                ScalarTarget::GiftScale => scene.set_gift_scale(value),
            });
            self.reveal.update(&mut self.camera, &self.animations, 1.0 / 60.0);
        }
    }

    #[test]
    fn degenerate_offset_falls_back_to_forward() {
        let dir = horizontal_offset_dir(ANCHOR, ANCHOR + Vec3::Y * 2.0);
        assert_eq!(dir, Vec3::Z);
        let target = view_target(ANCHOR, ANCHOR + Vec3::Y * 2.0, 1.28, 0.42);
        assert!(target.is_finite());
        assert!((target - Vec3::new(ANCHOR.x, ANCHOR.y + 0.42, ANCHOR.z + 1.28)).length() < 1e-5);
    }

    #[test]
    fn view_target_keeps_distance_and_height() {
        let camera = ANCHOR + Vec3::new(3.0, -1.0, 4.0);
        let target = view_target(ANCHOR, camera, 1.28, 0.42);
        let flat = Vec3::new(target.x - ANCHOR.x, 0.0, target.z - ANCHOR.z);
        assert!((flat.length() - 1.28).abs() < 1e-5);
        assert!((flat.normalize() - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-5);
        assert!((target.y - (ANCHOR.y + 0.42)).abs() < 1e-6);
    }

    #[test]
    fn press_before_arming_is_refused() {
        let mut rig = rig(true);
        assert_eq!(rig.press(true), Err(TriggerRefusal::OutOfRange));
        rig.reveal.arm();
        assert_eq!(rig.press(false), Err(TriggerRefusal::OutOfRange));
        assert_eq!(rig.reveal.state(), RevealState::Armed);
    }

    #[test]
    fn missing_gift_aborts_without_spending() {
        let mut rig = rig(false);
        rig.reveal.arm();
        assert_eq!(rig.press(true), Err(TriggerRefusal::GiftNotLoaded));
        assert_eq!(rig.reveal.state(), RevealState::Armed);
        assert!(rig.particles.is_empty());
    }

    #[test]
    fn failed_gift_load_is_refused_without_spending() {
        let mut rig = rig(false);
        rig.scene
            .slot(ModelKind::Gift)
            .resolve(Err(ViewerError::Fetch("assets/gift_tag.glb".into())));
        assert!(rig.scene.poll_assets().is_empty());
        rig.reveal.arm();
        assert_eq!(rig.press(true), Err(TriggerRefusal::GiftNotLoaded));
        assert_eq!(rig.reveal.state(), RevealState::Armed);
        assert!(!rig.reveal.is_spent());
        assert!(rig.particles.is_empty());
        assert!(rig.animations.is_empty());
    }

    #[test]
    fn reveal_runs_to_done_once() {
        let mut rig = rig(true);
        rig.reveal.arm();
        rig.press(true).unwrap();
        assert_eq!(rig.reveal.state(), RevealState::Animating);
        assert_eq!(rig.particles.len(), 1);

        let gift = rig.scene.model(ModelKind::Gift).unwrap();
        assert!(gift.visible);
        assert!((gift.scale - 0.1).abs() < 1e-6);
        assert!((rig.scene.gift_visual_center().unwrap() - ANCHOR).length() < 1e-6);

        assert_eq!(rig.press(true), Err(TriggerRefusal::AlreadyRevealed));
        assert_eq!(rig.particles.len(), 1);

        let end = rig.reveal.smooth_move().unwrap().end;
        let mut last = rig.reveal.state();
        let mut frames = 0;
        while rig.reveal.state() != RevealState::Done {
            rig.frame();
            assert!(rig.reveal.state() >= last);
            last = rig.reveal.state();
            let to_anchor = (ANCHOR - rig.camera.eye).normalize();
            assert!(rig.camera.forward().dot(to_anchor) > 0.999);
            frames += 1;
            assert!(frames <= 60);
        }
        assert_eq!(rig.camera.eye, end);
        assert_eq!(rig.scene.model(ModelKind::Gift).unwrap().scale, 1.0);
        assert!(rig.animations.is_empty());

        rig.reveal.arm();
        assert_eq!(rig.reveal.state(), RevealState::Done);
    }

    #[test]
    fn done_waits_for_scale_in() {
        let mut rig = rig(true);
        rig.reveal = RevealSequencer::new(RevealConfig {
            camera_clock: AnimationClock::PerFrame { step: 1.0 },
            ..RevealConfig::default()
        });
        rig.reveal.arm();
        rig.press(true).unwrap();
        rig.frame();
        assert!(rig.reveal.smooth_move().is_none());
        assert_eq!(rig.reveal.state(), RevealState::Animating);
        for _ in 0..20 {
            rig.frame();
        }
        assert_eq!(rig.reveal.state(), RevealState::Done);
    }
}
