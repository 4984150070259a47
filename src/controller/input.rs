/// Platform-agnostic input handling system
use std::collections::HashSet;

use serde::Deserialize;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard events
    KeyDown(String),
    KeyUp(String),

    // Mouse events
    MouseMove { dx: f32, dy: f32 },
    MouseClick { button: MouseButton },
    ContextMenu,

    // Window events
    FocusLost,
    PointerLockChanged { locked: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Single letters are case-folded so Shift+E still counts as `e`.
pub fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => c.to_lowercase().collect(),
        _ => key.to_string(),
    }
}

/// Held keys, accumulated look deltas and the key presses of this frame.
#[derive(Debug, Default)]
pub struct InputState {
    pub pressed_keys: HashSet<String>,
    pub look_delta: (f32, f32),
    pub pointer_locked: bool,
    key_presses: Vec<String>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                let key = normalize_key(key);
                self.key_presses.push(key.clone());
                self.pressed_keys.insert(key);
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(normalize_key(key).as_str());
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta.0 += dx;
                    self.look_delta.1 += dy;
                }
            }
            InputEvent::FocusLost => {
                self.clear_keys();
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
                if !locked {
                    self.look_delta = (0.0, 0.0);
                }
            }
            InputEvent::MouseClick { .. } | InputEvent::ContextMenu => {}
        }
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.look_delta)
    }

    /// Key-down edges since the last call, in arrival order.
    pub fn take_key_presses(&mut self) -> Vec<String> {
        std::mem::take(&mut self.key_presses)
    }
}

/// Key mapping configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub up: String,
    pub down: String,
    pub interact: String,
    pub dismiss_instructions: String,
    pub marker: String,
    pub escape: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            up: " ".to_string(),
            down: "Shift".to_string(),
            interact: "e".to_string(),
            dismiss_instructions: "Enter".to_string(),
            marker: "m".to_string(),
            escape: "Escape".to_string(),
        }
    }
}

/// High-level input processor
#[derive(Debug, Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    fn held(&self, input: &InputState, binding: &str) -> bool {
        input.is_key_pressed(&normalize_key(binding))
    }

    fn is(&self, key: &str, binding: &str) -> bool {
        normalize_key(key) == normalize_key(binding)
    }

    pub fn is_moving_forward(&self, input: &InputState) -> bool {
        self.held(input, &self.bindings.forward)
    }

    pub fn is_moving_backward(&self, input: &InputState) -> bool {
        self.held(input, &self.bindings.backward)
    }

    pub fn is_moving_left(&self, input: &InputState) -> bool {
        self.held(input, &self.bindings.left)
    }

    pub fn is_moving_right(&self, input: &InputState) -> bool {
        self.held(input, &self.bindings.right)
    }

    pub fn is_rising(&self, input: &InputState) -> bool {
        self.held(input, &self.bindings.up)
    }

    pub fn is_sinking(&self, input: &InputState) -> bool {
        self.held(input, &self.bindings.down)
    }

    pub fn is_marker_held(&self, input: &InputState) -> bool {
        self.held(input, &self.bindings.marker)
    }

    pub fn is_interact(&self, key: &str) -> bool {
        self.is(key, &self.bindings.interact)
    }

    pub fn is_dismiss_instructions(&self, key: &str) -> bool {
        self.is(key, &self.bindings.dismiss_instructions)
    }

    pub fn is_escape(&self, key: &str) -> bool {
        self.is(key, &self.bindings.escape)
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, MouseEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown(key)
        } else {
            InputEvent::KeyUp(key)
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove { dx: e.movement_x() as f32, dy: e.movement_y() as f32 }
    }

    pub fn mouse_click_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseClick { button: MouseButton::from_web_button(e.button()) }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::*;
    use winit::event::{ElementState, KeyEvent};
    use winit::keyboard::{Key, NamedKey};

    /// Key name in the same vocabulary as the browser's `KeyboardEvent.key`.
    pub fn key_name(key: &Key) -> Option<String> {
        match key {
            Key::Character(s) => Some(s.to_string()),
            Key::Named(NamedKey::Space) => Some(" ".to_string()),
            Key::Named(NamedKey::Shift) => Some("Shift".to_string()),
            Key::Named(NamedKey::Enter) => Some("Enter".to_string()),
            Key::Named(NamedKey::Escape) => Some("Escape".to_string()),
            Key::Named(NamedKey::Control) => Some("Control".to_string()),
            _ => None,
        }
    }

    pub fn keyboard_event_to_input(event: &KeyEvent) -> Option<InputEvent> {
        let key = key_name(&event.logical_key)?;
        Some(match event.state {
            ElementState::Pressed if event.repeat => return None,
            ElementState::Pressed => InputEvent::KeyDown(key),
            ElementState::Released => InputEvent::KeyUp(key),
        })
    }

    pub fn mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
        match button {
            winit::event::MouseButton::Left => Some(MouseButton::Left),
            winit::event::MouseButton::Right => Some(MouseButton::Right),
            winit::event::MouseButton::Middle => Some(MouseButton::Middle),
            _ => None,
        }
    }
}
