use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState};

/// Current keyboard state for the window.
///
/// Holds "is down" information; per-frame transitions are recorded into an
/// `InputFrame` as events are applied.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Set of currently held keys.
    keys_down: HashSet<Key>,
}

impl InputState {
    /// Applies a platform-agnostic input event and writes transition deltas
    /// to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match ev {
            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // On focus loss, drop the held set. Avoids stuck keys when
                    // the release happens while another window has focus.
                    self.keys_down.clear();
                }
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    // Repeats and duplicate press events are already in the
                    // set and must not produce a second edge.
                    if self.keys_down.insert(key) {
                        let _ = frame.keys_pressed.insert(key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(&key) {
                        let _ = frame.keys_released.insert(key);
                    }
                }
            },
        }
    }

    /// Whether `key` is currently held, as of the most recent event pump.
    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key) -> InputEvent {
        InputEvent::Key { key, state: KeyState::Pressed, repeat: false }
    }

    fn release(key: Key) -> InputEvent {
        InputEvent::Key { key, state: KeyState::Released, repeat: false }
    }

    #[test]
    fn press_sets_down_and_edge() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, press(Key::H));

        assert!(state.key_down(Key::H));
        assert!(frame.pressed(Key::H));
    }

    #[test]
    fn repeat_does_not_produce_second_edge() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, press(Key::H));
        frame.clear();
        state.apply_event(
            &mut frame,
            InputEvent::Key { key: Key::H, state: KeyState::Pressed, repeat: true },
        );

        assert!(state.key_down(Key::H));
        assert!(!frame.pressed(Key::H));
    }

    #[test]
    fn press_release_between_frames_is_one_frame_edge() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        // Both transitions arrive in the same event pump.
        state.apply_event(&mut frame, press(Key::R));
        state.apply_event(&mut frame, release(Key::R));

        // The frame observes the press edge exactly once...
        assert!(frame.pressed(Key::R));
        assert!(!state.key_down(Key::R));

        // ...and the next frame observes nothing.
        frame.clear();
        assert!(!frame.pressed(Key::R));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, release(Key::A));

        assert!(frame.keys_released.is_empty());
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, press(Key::W));
        state.apply_event(&mut frame, InputEvent::Focused(false));

        assert!(!state.key_down(Key::W));
    }
}
