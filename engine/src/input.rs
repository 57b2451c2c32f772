use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard state as seen by the current frame.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    down: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
}

impl InputState {
    pub fn handle_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.handle_key(code, event.state, event.repeat);
        }
    }

    /// Key repeats keep the key down but do not count as a new press.
    pub fn handle_key(&mut self, code: KeyCode, state: ElementState, repeat: bool) {
        match state {
            ElementState::Pressed => {
                if self.down.insert(code) && !repeat {
                    self.pressed.insert(code);
                }
            }
            ElementState::Released => {
                self.down.remove(&code);
            }
        }
    }

    pub fn is_down(&self, code: KeyCode) -> bool {
        self.down.contains(&code)
    }

    /// Went down since the last [`end_frame`](Self::end_frame).
    pub fn just_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    pub fn end_frame(&mut self) {
        self.pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_reported_for_one_frame() {
        let mut input = InputState::default();
        input.handle_key(KeyCode::KeyP, ElementState::Pressed, false);
        assert!(input.just_pressed(KeyCode::KeyP));
        assert!(input.is_down(KeyCode::KeyP));

        input.end_frame();
        assert!(!input.just_pressed(KeyCode::KeyP));
        assert!(input.is_down(KeyCode::KeyP));
    }

    #[test]
    fn repeats_are_not_new_presses() {
        let mut input = InputState::default();
        input.handle_key(KeyCode::Space, ElementState::Pressed, false);
        input.end_frame();
        input.handle_key(KeyCode::Space, ElementState::Pressed, true);
        assert!(!input.just_pressed(KeyCode::Space));
    }

    #[test]
    fn release_clears_down() {
        let mut input = InputState::default();
        input.handle_key(KeyCode::ArrowLeft, ElementState::Pressed, false);
        input.handle_key(KeyCode::ArrowLeft, ElementState::Released, false);
        assert!(!input.is_down(KeyCode::ArrowLeft));
        // Still counts as pressed this frame.
        assert!(input.just_pressed(KeyCode::ArrowLeft));
    }
}
