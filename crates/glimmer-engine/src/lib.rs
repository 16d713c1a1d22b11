//! Glimmer engine crate.
//!
//! This crate owns the platform + GPU runtime pieces used by the path-tracer
//! binary: window/event loop, GPU device + surface, keyboard input, frame
//! timing, the shader program registry, and the compute/blit render passes.

pub mod core;
pub mod device;
pub mod input;
pub mod render;
pub mod shader;
pub mod time;
pub mod window;

pub mod logging;
