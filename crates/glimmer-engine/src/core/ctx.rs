use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::Gpu;
use crate::input::{InputFrame, InputState};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Per-frame window handle.
pub struct WindowCtx<'a> {
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Framebuffer size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    /// Sets the window title.
    ///
    /// The harness uses this as its per-frame diagnostic channel for the
    /// dispatch duration; it is not a machine-readable interface.
    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,

    /// Input snapshot: immutable for the whole frame.
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,

    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}
