use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use vantage_common::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Delete,
    Escape,
    Space,
    LeftShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MouseButton {
    /// The select button.
    Left,
    Right,
    Middle,
}

/// Polled input state for the current frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held_keys: BTreeSet<Key>,
    pressed_keys: BTreeSet<Key>,
    held_buttons: BTreeSet<MouseButton>,
    pressed_buttons: BTreeSet<MouseButton>,
    cursor: Vec2,
    mouse_delta: Vec2,
    viewport: Viewport,
}

impl InputState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held_keys.insert(key) {
            self.pressed_keys.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.held_keys.remove(&key);
    }

    /// Returns `true` if the button was not already held.
    pub fn button_down(&mut self, button: MouseButton) -> bool {
        let newly = self.held_buttons.insert(button);
        if newly {
            self.pressed_buttons.insert(button);
        }
        newly
    }

    pub fn button_up(&mut self, button: MouseButton) {
        self.held_buttons.remove(&button);
    }

    /// Move the cursor to `position` in window pixels, accumulating the delta.
    pub fn set_cursor(&mut self, position: Vec2) {
        self.mouse_delta += position - self.cursor;
        self.cursor = position;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn is_key_held(&self, key: Key) -> bool {
        self.held_keys.contains(&key)
    }

    pub fn was_key_pressed(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.held_buttons.contains(&button)
    }

    pub fn was_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Cursor position in window pixels, origin top-left.
    pub fn cursor_position(&self) -> Vec2 {
        self.cursor
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Cursor in normalized device coordinates: x right, y up, both in `-1..=1`.
    pub fn cursor_ndc(&self) -> Vec2 {
        let Viewport { width, height } = self.viewport;
        if width == 0 || height == 0 {
            return Vec2::ZERO;
        }
        Vec2::new(
            2.0 * self.cursor.x / width as f32 - 1.0,
            1.0 - 2.0 * self.cursor.y / height as f32,
        )
    }

    /// Forget this frame's edges and mouse motion.
    pub fn end_frame(&mut self) {
        self.pressed_keys.clear();
        self.pressed_buttons.clear();
        self.mouse_delta = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_is_cleared_at_frame_end_but_held_is_not() {
        let mut input = InputState::default();
        input.key_down(Key::W);
        assert!(input.was_key_pressed(Key::W));
        input.end_frame();
        assert!(!input.was_key_pressed(Key::W));
        assert!(input.is_key_held(Key::W));
    }

    #[test]
    fn repeat_key_down_is_not_a_new_press() {
        let mut input = InputState::default();
        input.key_down(Key::A);
        input.end_frame();
        input.key_down(Key::A);
        assert!(!input.was_key_pressed(Key::A));
    }

    #[test]
    fn cursor_ndc_maps_corners() {
        let mut input = InputState::new(Viewport::new(200, 100));
        input.set_cursor(Vec2::new(0.0, 0.0));
        assert_eq!(input.cursor_ndc(), Vec2::new(-1.0, 1.0));
        input.set_cursor(Vec2::new(200.0, 100.0));
        assert_eq!(input.cursor_ndc(), Vec2::new(1.0, -1.0));
        input.set_cursor(Vec2::new(100.0, 50.0));
        assert_eq!(input.cursor_ndc(), Vec2::ZERO);
    }

    #[test]
    fn mouse_delta_accumulates_within_a_frame() {
        let mut input = InputState::default();
        input.set_cursor(Vec2::new(10.0, 0.0));
        input.set_cursor(Vec2::new(15.0, 5.0));
        assert_eq!(input.mouse_delta(), Vec2::new(15.0, 5.0));
        input.end_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }
}
