use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use workshop::controller::{FrameDriver, FrameRenderer, FrameView, InputEvent, RevealState, SessionEvent};
use workshop::model::{LoadedModel, ModelKind, Shading};
use workshop::utils::create_marker_mesh;
use workshop::ViewerConfig;

/// Keeps what each drawn frame showed.
#[derive(Default)]
struct RecordingRenderer {
    gift_scales: Vec<f32>,
    prompts: Vec<bool>,
    particle_counts: Vec<usize>,
}

impl FrameRenderer for RecordingRenderer {
    fn render(&mut self, frame: &FrameView<'_>) {
        if let Some(gift) = frame.scene.model(ModelKind::Gift).filter(|g| g.visible) {
            self.gift_scales.push(gift.scale);
        }
        self.prompts.push(frame.hud.prompt_visible);
        self.particle_counts.push(frame.particles.particle_count());
    }
}

fn cube(name: &str, size: f32, shading: Shading) -> LoadedModel {
    LoadedModel { name: name.to_string(), mesh: create_marker_mesh(size, [1.0; 4]), shading }
}

fn session() -> FrameDriver {
    FrameDriver::with_rng(&ViewerConfig::default(), 1280, 720, StdRng::seed_from_u64(42))
}

fn press(driver: &mut FrameDriver, key: &str) {
    driver.handle_event(InputEvent::KeyDown(key.to_string()));
    driver.handle_event(InputEvent::KeyUp(key.to_string()));
}

fn started(events: &[SessionEvent]) -> bool {
    events.iter().any(|e| matches!(e, SessionEvent::RevealStarted { .. }))
}

#[test]
fn late_gift_does_not_spend_the_reveal() {
    let mut driver = session();
    let mut renderer = RecordingRenderer::default();
    let anchor = driver.scene().anchor();

    driver
        .scene()
        .slot(ModelKind::Machine)
        .resolve(Ok(cube("machine", 1.0, Shading::Lit { emissive: 0.25 })));
    driver.camera_mut().eye = anchor + Vec3::new(0.0, 0.0, 3.0);
    driver.tick(0.016, &mut renderer);
    assert_eq!(driver.reveal_state(), RevealState::Armed);
    assert_eq!(renderer.prompts.last(), Some(&true));

    // gift still loading: the press is refused and nothing is spawned
    press(&mut driver, "e");
    assert!(!started(&driver.tick(0.016, &mut renderer)));
    assert_eq!(driver.reveal_state(), RevealState::Armed);
    assert!(driver.particles().is_empty());
    assert!(driver.is_interactable());

    driver.scene().slot(ModelKind::Gift).resolve(Ok(cube("gift", 0.3, Shading::Unlit)));
    let events = driver.tick(0.016, &mut renderer);
    assert_eq!(events, vec![SessionEvent::ModelReady(ModelKind::Gift)]);

    press(&mut driver, "E");
    let events = driver.tick(0.016, &mut renderer);
    assert!(started(&events));
    assert_eq!(driver.reveal_state(), RevealState::Animating);
    assert_eq!(renderer.prompts.last(), Some(&false));

    let mut frames = 0;
    while driver.reveal_state() != RevealState::Done {
        driver.tick(0.016, &mut renderer);
        frames += 1;
        assert!(frames < 200, "reveal never settled");
    }

    assert!(renderer.gift_scales.windows(2).all(|w| w[0] <= w[1]));
    assert!((renderer.gift_scales[0] - 0.1).abs() < 1e-6);
    assert!((renderer.gift_scales[1] - 0.15).abs() < 1e-6);
    assert_eq!(renderer.gift_scales.last(), Some(&1.0));
    assert!(renderer.particle_counts.iter().all(|&n| n <= 60));
}

#[test]
fn scale_in_steps_once_per_drawn_frame() {
    let mut driver = session();
    let mut renderer = RecordingRenderer::default();
    let anchor = driver.scene().anchor();
    driver
        .scene()
        .slot(ModelKind::Machine)
        .resolve(Ok(cube("machine", 1.0, Shading::Lit { emissive: 0.25 })));
    driver.scene().slot(ModelKind::Gift).resolve(Ok(cube("gift", 0.3, Shading::Unlit)));
    driver.camera_mut().eye = anchor + Vec3::new(0.0, 0.0, 3.0);
    driver.tick(0.016, &mut renderer);

    press(&mut driver, "e");
    assert!(started(&driver.tick(0.016, &mut renderer)));
    while renderer.gift_scales.last() != Some(&1.0) {
        driver.tick(0.016, &mut renderer);
        assert!(renderer.gift_scales.len() < 40);
    }

    // 0.10 drawn on the press frame, then +0.05 per frame up to 1.0
    assert!((renderer.gift_scales[0] - 0.1).abs() < 1e-6);
    for pair in renderer.gift_scales.windows(2) {
        assert!((pair[1] - pair[0] - 0.05).abs() < 1e-4, "{pair:?}");
    }
    assert_eq!(renderer.gift_scales.len(), 19);
}

#[test]
fn trigger_stays_off_after_the_reveal() {
    let mut driver = session();
    let mut renderer = RecordingRenderer::default();
    let anchor = driver.scene().anchor();
    for (kind, model) in [
        (ModelKind::Machine, cube("machine", 1.0, Shading::Lit { emissive: 0.25 })),
        (ModelKind::Gift, cube("gift", 0.3, Shading::Unlit)),
    ] {
        driver.scene().slot(kind).resolve(Ok(model));
    }

    driver.camera_mut().eye = anchor + Vec3::new(0.0, 0.0, 3.0);
    driver.tick(0.016, &mut renderer);
    press(&mut driver, "e");
    assert!(started(&driver.tick(0.016, &mut renderer)));

    for _ in 0..100 {
        driver.tick(0.016, &mut renderer);
    }
    assert_eq!(driver.reveal_state(), RevealState::Done);

    // walk away and come back
    driver.camera_mut().eye = anchor + Vec3::new(0.0, 0.0, 10.0);
    driver.tick(0.016, &mut renderer);
    driver.camera_mut().eye = anchor + Vec3::new(0.0, 0.0, 2.0);
    driver.tick(0.016, &mut renderer);
    assert!(!driver.is_interactable());

    press(&mut driver, "e");
    assert!(!started(&driver.tick(0.016, &mut renderer)));
    assert_eq!(driver.reveal_state(), RevealState::Done);
    assert!(driver.particles().is_empty());
    assert!(!renderer.prompts[1..].iter().any(|&p| p));
}

#[test]
fn out_of_range_press_is_ignored() {
    let mut driver = session();
    let mut renderer = RecordingRenderer::default();
    let anchor = driver.scene().anchor();
    driver
        .scene()
        .slot(ModelKind::Machine)
        .resolve(Ok(cube("machine", 1.0, Shading::Lit { emissive: 0.25 })));
    driver.scene().slot(ModelKind::Gift).resolve(Ok(cube("gift", 0.3, Shading::Unlit)));

    driver.camera_mut().eye = anchor + Vec3::new(0.0, 0.0, 4.5);
    driver.tick(0.016, &mut renderer);
    assert!(!driver.is_interactable());
    assert_eq!(driver.reveal_state(), RevealState::Idle);

    press(&mut driver, "e");
    assert!(!started(&driver.tick(0.016, &mut renderer)));
    assert!(renderer.gift_scales.is_empty());
}
