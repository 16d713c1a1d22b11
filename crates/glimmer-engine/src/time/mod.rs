//! Frame timing.
//!
//! One `FrameClock` per render loop; call `tick()` once per frame to obtain
//! a `FrameTime` snapshot. The elapsed value feeds the path tracer's `time`
//! uniform.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
