use std::collections::HashSet;

use super::types::Key;

/// Per-frame input deltas.
///
/// `InputState` holds the current "is down" information; `InputFrame` holds
/// the transitions observed since the previous frame. The runtime clears it
/// after each frame is consumed, so a key pressed between two frames is
/// reported as pressed for exactly one frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Keys that transitioned to down this frame.
    pub keys_pressed: HashSet<Key>,

    /// Keys that transitioned to up this frame.
    pub keys_released: HashSet<Key>,
}

impl InputFrame {
    /// Whether `key` transitioned to down this frame.
    pub fn pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
    }
}
