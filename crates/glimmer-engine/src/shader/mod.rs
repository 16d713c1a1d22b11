//! Shader program registry.
//!
//! Maps logical names ("path-tracer", "screen") to validated WGSL sources.
//! The registry is CPU-side: it reads files, composes multi-stage sources,
//! and validates with naga before anything reaches the device. Render passes
//! derive GPU modules/pipelines from entries and rebuild them when an
//! entry's generation changes.
//!
//! The hot-reload invariant lives here: an entry's source is replaced only
//! after the new source validates, so a failed reload leaves the previously
//! active program in use.

mod registry;
mod source;

pub use registry::{ShaderEntry, ShaderRegistry};
pub use source::ShaderSources;
