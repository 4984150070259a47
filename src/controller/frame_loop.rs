use glam::Vec3;
use rand::rngs::StdRng;

use crate::config::ViewerConfig;
use crate::controller::camera_controller::CameraController;
use crate::controller::debug;
use crate::controller::input::{InputEvent, InputProcessor, InputState, MouseButton};
use crate::controller::proximity::ProximityTrigger;
use crate::controller::reveal::{RevealSequencer, RevealState};
use crate::model::{Camera, HudState, ModelKind, ParticlePool, ScalarAnimations, ScalarTarget, Scene};

/// Largest frame step fed to the simulation, in seconds.
pub const MAX_FRAME_DT: f32 = 0.1;

/// Things the platform layer has to act on after a frame or an input event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ModelReady(ModelKind),
    /// Play the reveal cue.
    RevealStarted { anchor: Vec3 },
    RequestPointerLock,
    ReleasePointerLock,
}

/// Everything a renderer needs to draw one frame.
pub struct FrameView<'a> {
    pub camera: &'a Camera,
    pub scene: &'a Scene,
    pub particles: &'a ParticlePool,
    pub hud: &'a HudState,
}

pub trait FrameRenderer {
    fn render(&mut self, frame: &FrameView<'_>);
}

/// Owns the whole session and advances it one frame at a time.
pub struct FrameDriver {
    camera: Camera,
    scene: Scene,
    input: InputState,
    processor: InputProcessor,
    camera_controller: CameraController,
    proximity: ProximityTrigger,
    reveal: RevealSequencer,
    animations: ScalarAnimations,
    particles: ParticlePool,
    hud: HudState,
    pending: Vec<SessionEvent>,
}

impl FrameDriver {
    pub fn new(config: &ViewerConfig, width: u32, height: u32) -> Self {
        Self::with_particles(config, width, height, ParticlePool::new(config.particles.clone()))
    }

    /// Same as `new` but with a fixed particle seed.
    pub fn with_rng(config: &ViewerConfig, width: u32, height: u32, rng: StdRng) -> Self {
        Self::with_particles(config, width, height, ParticlePool::with_rng(config.particles.clone(), rng))
    }

    fn with_particles(config: &ViewerConfig, width: u32, height: u32, particles: ParticlePool) -> Self {
        Self {
            camera: Camera::from_config(&config.camera, width, height),
            scene: Scene::new(config.scene.anchor()),
            input: InputState::new(),
            processor: InputProcessor::new(config.keys.clone()),
            camera_controller: CameraController::from_config(&config.camera),
            proximity: ProximityTrigger::new(config.scene.trigger_distance),
            reveal: RevealSequencer::new(config.reveal.clone()),
            animations: ScalarAnimations::new(),
            particles,
            hud: HudState::default(),
            pending: Vec::new(),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn hud(&self) -> &HudState {
        &self.hud
    }

    pub fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    pub fn reveal_state(&self) -> RevealState {
        self.reveal.state()
    }

    pub fn is_interactable(&self) -> bool {
        self.proximity.is_interactable()
    }

    pub fn is_pointer_locked(&self) -> bool {
        self.input.pointer_locked
    }

    /// Teleport the camera; used by the platform layer and tests.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    /// Feed one input event. Anything the platform must do in response is
    /// returned with the next `tick`.
    pub fn handle_event(&mut self, event: InputEvent) {
        self.input.process_event(&event);

        match event {
            InputEvent::KeyDown(key) => {
                if self.processor.is_dismiss_instructions(&key) && self.hud.dismiss_instructions() {
                    tracing::info!("instructions dismissed");
                }
                if self.processor.is_escape(&key) && self.input.pointer_locked {
                    self.pending.push(SessionEvent::ReleasePointerLock);
                }
            }
            InputEvent::MouseClick { button: MouseButton::Left } => {
                debug::log_camera(&self.camera);
                if self.processor.is_marker_held(&self.input) {
                    debug::place_marker(&self.camera, &mut self.scene);
                } else if !self.hud.instructions_visible && !self.input.pointer_locked {
                    self.pending.push(SessionEvent::RequestPointerLock);
                }
            }
            InputEvent::ContextMenu => {
                debug::report_gift(&self.scene);
            }
            InputEvent::PointerLockChanged { locked } => {
                tracing::debug!(locked, "pointer lock changed");
            }
            InputEvent::FocusLost => {
                tracing::debug!("focus lost, held keys cleared");
            }
            InputEvent::KeyUp(_) | InputEvent::MouseMove { .. } | InputEvent::MouseClick { .. } => {}
        }
    }

    /// Advance the session by `dt` seconds and draw it.
    pub fn tick(&mut self, dt: f32, renderer: &mut impl FrameRenderer) -> Vec<SessionEvent> {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        let mut events = std::mem::take(&mut self.pending);

        for kind in self.scene.poll_assets() {
            events.push(SessionEvent::ModelReady(kind));
        }

        // look + movement
        let (dx, dy) = self.input.consume_look();
        if self.input.pointer_locked {
            self.camera_controller.apply_look(&mut self.camera, dx, dy);
            self.camera_controller
                .update_movement(&mut self.camera, &self.input, &self.processor, dt);
        }

        // interaction presses, against last frame's proximity result
        for key in self.input.take_key_presses() {
            if !self.processor.is_interact(&key) {
                continue;
            }
            let result = self.reveal.try_trigger(
                self.proximity.is_interactable(),
                &self.camera,
                &mut self.scene,
                &mut self.particles,
                &mut self.animations,
                dt,
            );
            match result {
                Ok(()) => {
                    self.hud.set_prompt(false);
                    events.push(SessionEvent::RevealStarted { anchor: self.scene.anchor() });
                }
                Err(refusal) => tracing::debug!(?refusal, "interaction ignored"),
            }
        }

        self.reveal.update(&mut self.camera, &self.animations, dt);

        let scene = &mut self.scene;
        self.animations.advance(dt, |target, value| match target {
            ScalarTarget::GiftScale => scene.set_gift_scale(value),
        });

        self.particles.update(dt);

        if self.scene.is_ready(ModelKind::Machine) {
            let interactable = self.proximity.update(
                self.camera.eye,
                self.scene.anchor(),
                self.reveal.is_spent(),
                &mut self.hud,
            );
            if interactable {
                self.reveal.arm();
            }
        } else {
            self.proximity.reset(&mut self.hud);
        }

        renderer.render(&FrameView {
            camera: &self.camera,
            scene: &self.scene,
            particles: &self.particles,
            hud: &self.hud,
        });

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scene::tests::cube_model;
    use crate::model::Shading;
    use rand::SeedableRng;

    #[derive(Default)]
    struct CountingRenderer {
        frames: usize,
        prompt_seen: bool,
    }

    impl FrameRenderer for CountingRenderer {
        fn render(&mut self, frame: &FrameView<'_>) {
            self.frames += 1;
            self.prompt_seen |= frame.hud.prompt_visible;
        }
    }

    fn driver() -> FrameDriver {
        FrameDriver::with_rng(&ViewerConfig::default(), 800, 600, StdRng::seed_from_u64(7))
    }

    #[test]
    fn click_requests_lock_only_after_instructions() {
        let mut d = driver();
        let mut r = CountingRenderer::default();

        d.handle_event(InputEvent::MouseClick { button: MouseButton::Left });
        assert!(d.tick(0.016, &mut r).is_empty());

        d.handle_event(InputEvent::KeyDown("Enter".into()));
        assert!(!d.hud().instructions_visible);
        d.handle_event(InputEvent::MouseClick { button: MouseButton::Left });
        assert_eq!(d.tick(0.016, &mut r), vec![SessionEvent::RequestPointerLock]);

        d.handle_event(InputEvent::PointerLockChanged { locked: true });
        d.handle_event(InputEvent::MouseClick { button: MouseButton::Left });
        d.handle_event(InputEvent::KeyDown("Escape".into()));
        assert_eq!(d.tick(0.016, &mut r), vec![SessionEvent::ReleasePointerLock]);
        assert_eq!(r.frames, 3);
    }

    #[test]
    fn movement_needs_pointer_lock() {
        let mut d = driver();
        let mut r = CountingRenderer::default();
        let start = d.camera().eye;

        d.handle_event(InputEvent::KeyDown("w".into()));
        d.tick(0.05, &mut r);
        assert_eq!(d.camera().eye, start);

        d.handle_event(InputEvent::PointerLockChanged { locked: true });
        d.tick(0.05, &mut r);
        assert!(d.camera().eye.z < start.z);
    }

    #[test]
    fn oversized_steps_are_clamped() {
        let mut d = driver();
        let mut r = CountingRenderer::default();
        let start = d.camera().eye;
        d.handle_event(InputEvent::PointerLockChanged { locked: true });
        d.handle_event(InputEvent::KeyDown("w".into()));
        d.tick(5.0, &mut r);
        let moved = start.z - d.camera().eye.z;
        assert!((moved - 0.6 * MAX_FRAME_DT).abs() < 1e-5);
        d.tick(f32::NAN, &mut r);
        assert!(d.camera().eye.is_finite());
    }

    #[test]
    fn proximity_waits_for_machine() {
        let mut d = driver();
        let mut r = CountingRenderer::default();
        d.camera_mut().eye = d.scene().anchor() + Vec3::new(0.0, 0.0, 3.0);
        d.tick(0.016, &mut r);
        assert!(!d.is_interactable());
        assert_eq!(d.reveal_state(), RevealState::Idle);

        d.scene
            .slot(ModelKind::Machine)
            .resolve(Ok(cube_model("machine", 1.0, Vec3::ZERO, Shading::Lit { emissive: 0.25 })));
        let events = d.tick(0.016, &mut r);
        assert_eq!(events, vec![SessionEvent::ModelReady(ModelKind::Machine)]);
        assert!(d.is_interactable());
        assert!(r.prompt_seen);
        assert_eq!(d.reveal_state(), RevealState::Armed);
    }

    #[test]
    fn reveal_runs_once_from_press_to_rest() {
        let mut d = driver();
        let mut r = CountingRenderer::default();
        let anchor = d.scene().anchor();
        d.scene()
            .slot(ModelKind::Machine)
            .resolve(Ok(cube_model("machine", 1.0, Vec3::ZERO, Shading::Lit { emissive: 0.25 })));
        d.scene()
            .slot(ModelKind::Gift)
            .resolve(Ok(cube_model("gift", 0.3, Vec3::new(0.0, 0.1, 0.0), Shading::Unlit)));
        d.camera_mut().eye = anchor + Vec3::new(0.0, 0.0, 3.0);
        d.tick(0.016, &mut r);
        assert_eq!(d.reveal_state(), RevealState::Armed);

        d.handle_event(InputEvent::KeyDown("e".into()));
        let events = d.tick(0.016, &mut r);
        assert!(events.contains(&SessionEvent::RevealStarted { anchor }));
        assert_eq!(d.reveal_state(), RevealState::Animating);
        assert!(!d.hud().prompt_visible);
        assert_eq!(d.particles().len(), 1);
        let scale = d.scene().model(ModelKind::Gift).map(|g| g.scale);
        assert!(scale.is_some_and(|s| (s - 0.1).abs() < 1e-6));

        d.handle_event(InputEvent::KeyUp("e".into()));
        d.handle_event(InputEvent::KeyDown("e".into()));
        let events = d.tick(0.016, &mut r);
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::RevealStarted { .. })));
        assert_eq!(d.particles().len(), 1);

        for _ in 0..80 {
            d.tick(0.016, &mut r);
            assert!(!d.is_interactable());
        }
        assert_eq!(d.reveal_state(), RevealState::Done);
        assert!(d.particles().is_empty());

        let expected = anchor + Vec3::new(0.0, 0.42, 1.28);
        assert!((d.camera().eye - expected).length() < 1e-4);
        let to_anchor = (anchor - d.camera().eye).normalize();
        assert!(d.camera().forward().dot(to_anchor) > 0.999);

        let gift = d.scene().model(ModelKind::Gift).unwrap();
        assert!(gift.visible);
        assert!((gift.scale - 1.0).abs() < 1e-6);
        assert!((d.scene().gift_visual_center().unwrap() - anchor).length() < 1e-5);
    }
}
