use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// On-disk sources for one shader program.
///
/// A program is either a single compute stage or a vertex+fragment pair.
/// WGSL modules carry multiple entry points, so the pair is composed into
/// one module (`vs_main` + `fs_main`) before validation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ShaderSources {
    Compute { path: PathBuf },
    Render { vertex: PathBuf, fragment: PathBuf },
}

impl ShaderSources {
    /// Reads and composes the source files into a single WGSL string.
    pub(crate) fn read(&self) -> Result<String> {
        match self {
            Self::Compute { path } => fs::read_to_string(path)
                .with_context(|| format!("failed to read compute shader {}", path.display())),

            Self::Render { vertex, fragment } => {
                let vs = fs::read_to_string(vertex)
                    .with_context(|| format!("failed to read vertex shader {}", vertex.display()))?;
                let fs = fs::read_to_string(fragment).with_context(|| {
                    format!("failed to read fragment shader {}", fragment.display())
                })?;
                Ok(format!("{vs}\n\n{fs}"))
            }
        }
    }
}

/// Parses and validates a WGSL source without touching the device.
///
/// Runs the naga front-end and validator; a source that passes here will not
/// fail module creation later.
pub(crate) fn validate_wgsl(source: &str) -> Result<naga::Module> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| anyhow::anyhow!("{}", e.emit_to_string(source)))?;

    let _info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow::anyhow!("shader validation failed: {e:?}"))?;

    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const VALID_COMPUTE: &str = r"
@group(0) @binding(0) var output: texture_storage_2d<rgba8unorm, write>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(output);
    if gid.x >= dims.x || gid.y >= dims.y {
        return;
    }
    textureStore(output, gid.xy, vec4<f32>(0.0, 0.0, 0.0, 1.0));
}
";

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "glimmer-source-test-{}-{name}",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
    }

    #[test]
    fn valid_compute_source_passes() {
        assert!(validate_wgsl(VALID_COMPUTE).is_ok());
    }

    #[test]
    fn parse_error_is_reported() {
        let err = validate_wgsl("fn main( {").unwrap_err();
        assert!(err.to_string().contains("error"));
    }

    #[test]
    fn type_error_fails_validation() {
        // Parses, but the entry point is malformed (vertex with no position).
        let src = "@vertex fn vs_main() -> @location(0) f32 { return 1.0; }";
        assert!(validate_wgsl(src).is_err());
    }

    #[test]
    fn render_pair_is_composed_in_stage_order() {
        let vs = temp_file("compose.vert.wgsl", "// vertex stage");
        let fs = temp_file("compose.frag.wgsl", "// fragment stage");

        let sources = ShaderSources::Render { vertex: vs.clone(), fragment: fs.clone() };
        let composed = sources.read().unwrap();

        let v = composed.find("vertex stage").unwrap();
        let f = composed.find("fragment stage").unwrap();
        assert!(v < f);

        cleanup(&vs);
        cleanup(&fs);
    }

    #[test]
    fn missing_file_is_an_error() {
        let sources = ShaderSources::Compute {
            path: PathBuf::from("does/not/exist.wgsl"),
        };
        assert!(sources.read().is_err());
    }
}
