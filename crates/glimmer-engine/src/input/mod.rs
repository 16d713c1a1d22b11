//! Keyboard input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! The runtime translates platform events into `InputEvent`s as they are
//! pumped; a frame then reads an immutable snapshot, so key state is
//! frame-coherent rather than polled mid-frame.

mod frame;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{InputEvent, Key, KeyState};
