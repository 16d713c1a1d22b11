//! Render passes.
//!
//! One frame is: path-trace compute dispatch into the presentation image
//! (with a synchronous wait, measured for diagnostics), then a fullscreen
//! blit of that image to the swapchain. Passes cache their GPU pipelines and
//! rebuild them when the shader registry generation or the surface format
//! changes.

mod blit;
mod image;
mod pathtrace;

pub use blit::BlitPass;
pub use image::{PresentImage, ResizePolicy};
pub use pathtrace::{PathTracePass, TILE_SIZE, dispatch_extent};
