use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowId};

use workshop::controller::input::native::{keyboard_event_to_input, mouse_button};
use workshop::controller::{FrameDriver, InputEvent, MouseButton, SessionEvent};
use workshop::view::loader::native::{spawn_loads, LoadResult};
use workshop::view::{GpuContext, Renderer};
use workshop::{logging, ViewerConfig};

struct App {
    window: Arc<Window>,
    renderer: Renderer,
    egui_state: egui_winit::State,
    driver: FrameDriver,
    loads: Option<Receiver<LoadResult>>,
    last_frame_time: Instant,
}

impl App {
    fn new(window: Arc<Window>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let gpu = pollster::block_on(GpuContext::new_native(window.clone())).context("GPU init failed")?;
        let mut renderer = Renderer::new(gpu, config);
        renderer.set_pixels_per_point(window.scale_factor() as f32);

        let egui_state = egui_winit::State::new(
            renderer.egui_ctx().clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Self {
            renderer,
            egui_state,
            driver: FrameDriver::new(config, size.width, size.height),
            loads: Some(spawn_loads(&config.scene)),
            last_frame_time: Instant::now(),
            window,
        })
    }

    /// Hand finished background loads to the scene.
    fn poll_loads(&mut self) {
        let Some(rx) = &self.loads else { return };
        let finished = loop {
            match rx.try_recv() {
                Ok((kind, result)) => self.driver.scene().slot(kind).resolve(result),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };
        if finished {
            self.loads = None;
        }
    }

    fn set_pointer_lock(&mut self, locked: bool) {
        if locked {
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grabbed {
                tracing::warn!(error = %e, "cursor grab failed");
                return;
            }
        } else if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
            tracing::warn!(error = %e, "cursor release failed");
        }
        self.window.set_cursor_visible(!locked);
        self.driver.handle_event(InputEvent::PointerLockChanged { locked });
    }

    fn input(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(input) = keyboard_event_to_input(event) {
                    self.driver.handle_event(input);
                }
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button, .. } => {
                match mouse_button(*button) {
                    Some(MouseButton::Right) => self.driver.handle_event(InputEvent::ContextMenu),
                    Some(button) => self.driver.handle_event(InputEvent::MouseClick { button }),
                    None => {}
                }
            }
            WindowEvent::Focused(false) => {
                self.driver.handle_event(InputEvent::FocusLost);
                if self.driver.is_pointer_locked() {
                    self.set_pointer_lock(false);
                }
            }
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        self.poll_loads();
        let raw_input = self.egui_state.take_egui_input(&self.window);
        self.renderer.queue_egui_input(raw_input);

        let events = self.driver.tick(dt, &mut self.renderer);
        for event in events {
            match event {
                SessionEvent::RequestPointerLock => self.set_pointer_lock(true),
                SessionEvent::ReleasePointerLock => self.set_pointer_lock(false),
                SessionEvent::RevealStarted { anchor } => tracing::info!(?anchor, "pop"),
                SessionEvent::ModelReady(_) => {}
            }
        }
    }
}

/// Creates the window on first resume, then forwards events to [`App`].
struct Viewer {
    config: ViewerConfig,
    app: Option<App>,
    error: Option<anyhow::Error>,
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Workshop")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let created = event_loop
            .create_window(attributes)
            .context("window creation failed")
            .and_then(|window| App::new(Arc::new(window), &self.config));
        match created {
            Ok(app) => self.app = Some(app),
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(app) = self.app.as_mut() else { return };
        if window_id != app.window.id() {
            return;
        }

        let _ = app.egui_state.on_window_event(app.window.as_ref(), &event);
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if app.renderer.resize(size.width, size.height) {
                    app.driver.resize(size.width, size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                app.renderer.set_pixels_per_point(scale_factor as f32);
            }
            WindowEvent::RedrawRequested => app.redraw(),
            ref other => app.input(other),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let (Some(app), DeviceEvent::MouseMotion { delta }) = (self.app.as_mut(), event) {
            app.driver.handle_event(InputEvent::MouseMove { dx: delta.0 as f32, dy: delta.1 as f32 });
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app) = &self.app {
            app.window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let config = ViewerConfig::load_default_location().context("failed to load config")?;
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut viewer = Viewer { config, app: None, error: None };
    event_loop.run_app(&mut viewer)?;

    match viewer.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
