// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

pub use config::ViewerConfig;
pub use controller::{FrameDriver, SessionEvent};
pub use error::ViewerError;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use web_sys::{Document, Event, HtmlAudioElement, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

    use crate::config::ViewerConfig;
    use crate::controller::input::wasm::{keyboard_event_to_input, mouse_click_to_input, mouse_move_to_input};
    use crate::controller::{FrameDriver, InputEvent, SessionEvent};
    use crate::logging;
    use crate::model::ModelKind;
    use crate::view::loader::web::spawn_load;
    use crate::view::{GpuContext, Renderer};

    #[wasm_bindgen(start)]
    pub async fn start() -> Result<(), JsValue> {
        logging::init();
        let (window, document, canvas) = init_canvas()?;
        setup_app(&window, &document, &canvas, ViewerConfig::default()).await
    }

    /// Canvas size in device pixels.
    fn canvas_size(window: &Window) -> (u32, u32) {
        let dpr = window.device_pixel_ratio();
        let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
        let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
        ((w * dpr).max(1.0) as u32, (h * dpr).max(1.0) as u32)
    }

    /// Main application setup for WASM
    async fn setup_app(
        window: &Window,
        document: &Document,
        canvas: &HtmlCanvasElement,
        config: ViewerConfig,
    ) -> Result<(), JsValue> {
        let (width, height) = canvas_size(window);
        canvas.set_width(width);
        canvas.set_height(height);

        let gpu = GpuContext::new(canvas, width, height)
            .await
            .map_err(|e| js_error(format!("GPU init failed: {e}")))?;
        let mut renderer = Renderer::new(gpu, &config);
        renderer.set_pixels_per_point(window.device_pixel_ratio() as f32);

        let driver = Rc::new(RefCell::new(FrameDriver::new(&config, width, height)));
        for kind in [ModelKind::Machine, ModelKind::Gift] {
            let slot = driver.borrow().scene().slot(kind);
            spawn_load(kind, &config.scene, slot);
        }

        let pop_sound = match HtmlAudioElement::new_with_src(&config.scene.pop_sound_path) {
            Ok(audio) => Some(audio),
            Err(e) => {
                tracing::warn!(error = ?e, "pop sound unavailable");
                None
            }
        };

        setup_input_listeners(document, window, driver.clone())?;

        let mut last_time = now(window);
        let f = RcCellCallback::new(window.clone(), {
            let window = window.clone();
            let document = document.clone();
            let canvas = canvas.clone();

            move || {
                let t = now(&window);
                let dt = ((t - last_time) / 1000.0) as f32;
                last_time = t;

                let (w, h) = canvas_size(&window);
                if renderer.resize(w, h) {
                    canvas.set_width(w);
                    canvas.set_height(h);
                    renderer.set_pixels_per_point(window.device_pixel_ratio() as f32);
                    driver.borrow_mut().resize(w, h);
                }

                let events = driver.borrow_mut().tick(dt, &mut renderer);
                for event in events {
                    match event {
                        SessionEvent::RequestPointerLock => canvas.request_pointer_lock(),
                        SessionEvent::ReleasePointerLock => document.exit_pointer_lock(),
                        SessionEvent::RevealStarted { .. } => play(pop_sound.as_ref()),
                        SessionEvent::ModelReady(_) => {}
                    }
                }
            }
        });
        f.start();

        Ok(())
    }

    fn now(window: &Window) -> f64 {
        window.performance().map(|p| p.now()).unwrap_or(0.0)
    }

    fn play(audio: Option<&HtmlAudioElement>) {
        let Some(audio) = audio else { return };
        audio.set_current_time(0.0);
        if let Err(e) = audio.play() {
            tracing::warn!(error = ?e, "pop sound failed to play");
        }
    }

    fn is_navigation_key(key: &str) -> bool {
        matches!(key, "w" | "a" | "s" | "d" | "W" | "A" | "S" | "D" | " " | "Shift")
    }

    /// Forward DOM events to the frame driver as platform-agnostic input.
    fn setup_input_listeners(
        document: &Document,
        window: &Window,
        driver: Rc<RefCell<FrameDriver>>,
    ) -> Result<(), JsValue> {
        // Keyboard down
        {
            let driver = driver.clone();
            let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                if e.repeat() {
                    return;
                }
                if is_navigation_key(&e.key()) {
                    e.prevent_default();
                }
                driver.borrow_mut().handle_event(keyboard_event_to_input(&e, true));
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
            keydown.forget();
        }

        // Keyboard up
        {
            let driver = driver.clone();
            let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                driver.borrow_mut().handle_event(keyboard_event_to_input(&e, false));
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
            keyup.forget();
        }

        // Focus loss - clear all keys
        {
            let driver = driver.clone();
            let blur = Closure::wrap(Box::new(move |_e: Event| {
                driver.borrow_mut().handle_event(InputEvent::FocusLost);
            }) as Box<dyn FnMut(Event)>);
            window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
            blur.forget();
        }

        // Visibility change - clear all keys
        {
            let driver = driver.clone();
            let visibility = Closure::wrap(Box::new(move |_e: Event| {
                driver.borrow_mut().handle_event(InputEvent::FocusLost);
            }) as Box<dyn FnMut(Event)>);
            document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
            visibility.forget();
        }

        // Pointer lock change
        {
            let driver = driver.clone();
            let doc_pl = document.clone();
            let plc = Closure::wrap(Box::new(move |_e: Event| {
                let locked = doc_pl.pointer_lock_element().is_some();
                driver.borrow_mut().handle_event(InputEvent::PointerLockChanged { locked });
            }) as Box<dyn FnMut(Event)>);
            document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
            plc.forget();
        }

        // Mouse move
        {
            let driver = driver.clone();
            let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
                driver.borrow_mut().handle_event(mouse_move_to_input(&e));
            }) as Box<dyn FnMut(MouseEvent)>);
            document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
            mm.forget();
        }

        // Click - pointer lock request, camera log, debug marker
        {
            let driver = driver.clone();
            let click = Closure::wrap(Box::new(move |e: MouseEvent| {
                driver.borrow_mut().handle_event(mouse_click_to_input(&e));
            }) as Box<dyn FnMut(MouseEvent)>);
            document.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
            click.forget();
        }

        // Context menu - gift position report
        {
            let contextmenu = Closure::wrap(Box::new(move |e: MouseEvent| {
                e.prevent_default();
                driver.borrow_mut().handle_event(InputEvent::ContextMenu);
            }) as Box<dyn FnMut(MouseEvent)>);
            document.add_event_listener_with_callback("contextmenu", contextmenu.as_ref().unchecked_ref())?;
            contextmenu.forget();
        }

        Ok(())
    }

    fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
        let window = web_sys::window().ok_or(js_error("no global `window`"))?;
        let document = window.document().ok_or(js_error("no document on window"))?;
        let body = document.body().ok_or(js_error("no body on document"))?;
        body.set_attribute("style", "margin:0;overflow:hidden")?;
        let canvas_el = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("failed to create canvas"))?;
        canvas_el.set_attribute("style", "display:block;width:100vw;height:100vh")?;
        body.append_child(&canvas_el)?;
        Ok((window, document, canvas_el))
    }

    fn js_error<E: Into<String>>(msg: E) -> JsValue {
        JsValue::from_str(&msg.into())
    }

    /// Self-rescheduling requestAnimationFrame loop.
    struct RcCellCallback {
        inner: Rc<RefCell<Box<dyn FnMut()>>>,
        window: Window,
    }

    impl RcCellCallback {
        fn new(window: Window, f: impl FnMut() + 'static) -> Self {
            Self { inner: Rc::new(RefCell::new(Box::new(f))), window }
        }

        fn start(self) {
            let inner = self.inner.clone();
            let window = self.window.clone();

            let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
            let callback_clone = callback.clone();

            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                inner.borrow_mut().as_mut()();

                // Recursively schedule next frame
                if let Some(cb) = callback_clone.borrow().as_ref() {
                    if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        tracing::error!(error = ?e, "requestAnimationFrame failed, loop stopped");
                    }
                }
            }) as Box<dyn FnMut()>));

            if let Some(cb) = callback.borrow().as_ref() {
                if let Err(e) = self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!(error = ?e, "requestAnimationFrame failed to start");
                }
            }

            // Leak the closure to keep it alive
            std::mem::forget(callback);
        }
    }
}
