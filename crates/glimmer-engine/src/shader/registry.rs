use std::collections::HashMap;

use anyhow::{Context, Result};

use super::source::{ShaderSources, validate_wgsl};

/// A registered shader program: its source paths and the last WGSL text that
/// passed validation.
///
/// The generation counter changes whenever the source text is replaced;
/// render passes use it to decide when their cached GPU pipelines are stale.
#[derive(Debug)]
pub struct ShaderEntry {
    sources: ShaderSources,
    wgsl: String,
    generation: u64,
}

impl ShaderEntry {
    /// The last-good validated WGSL source.
    pub fn wgsl(&self) -> &str {
        &self.wgsl
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sources(&self) -> &ShaderSources {
        &self.sources
    }
}

/// Mapping from logical program name to its validated source.
///
/// Lookups are O(1); names are unique (re-registering a name replaces the
/// entry). Lookup of an unregistered name is a loud error — callers decide
/// whether to propagate (startup) or log and skip (per-frame).
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    entries: HashMap<String, ShaderEntry>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads, composes, and validates `sources`, then stores the program
    /// under `name`, replacing any prior entry.
    ///
    /// On failure the registry is unchanged: a prior entry under `name`
    /// stays as it was, and a first registration leaves the name unset.
    /// Initial registrations happen at startup where the caller treats the
    /// error as fatal.
    pub fn register(&mut self, name: &str, sources: ShaderSources) -> Result<()> {
        let wgsl = compile(&sources).with_context(|| format!("registering shader '{name}'"))?;

        let generation = self
            .entries
            .get(name)
            .map_or(1, |prior| prior.generation + 1);

        let _ = self.entries.insert(
            name.to_owned(),
            ShaderEntry {
                sources,
                wgsl,
                generation,
            },
        );

        log::info!("shader '{name}' registered (generation {generation})");
        Ok(())
    }

    /// Recompiles the named programs from their source files.
    ///
    /// Per name: success replaces the stored source and bumps the
    /// generation; a compile error is logged and the entry is left
    /// untouched, so the previously active program stays in use. Unknown
    /// names are logged and skipped. Returns the number of programs that
    /// were actually replaced.
    pub fn reload<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        let mut replaced = 0;

        for name in names {
            let name = name.as_ref();
            let Some(entry) = self.entries.get_mut(name) else {
                log::error!("hot-reload requested for unregistered shader '{name}'");
                continue;
            };

            match compile(&entry.sources) {
                Ok(wgsl) => {
                    entry.wgsl = wgsl;
                    entry.generation += 1;
                    replaced += 1;
                    log::info!(
                        "shader '{name}' reloaded (generation {})",
                        entry.generation
                    );
                }
                Err(e) => {
                    log::error!("hot-reload of shader '{name}' failed, keeping previous: {e:#}");
                }
            }
        }

        replaced
    }

    /// Looks up a registered program.
    pub fn get(&self, name: &str) -> Result<&ShaderEntry> {
        self.entries
            .get(name)
            .with_context(|| format!("shader '{name}' is not registered"))
    }
}

/// Full CPU-side compile: read from disk, compose stages, validate.
fn compile(sources: &ShaderSources) -> Result<String> {
    let wgsl = sources.read()?;
    let _ = validate_wgsl(&wgsl)?;
    Ok(wgsl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const VALID: &str = r"
@group(0) @binding(0) var output: texture_storage_2d<rgba8unorm, write>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    textureStore(output, gid.xy, vec4<f32>(1.0));
}
";

    const INVALID: &str = "@compute fn broken( {";

    struct TempShader {
        path: PathBuf,
    }

    impl TempShader {
        fn new(name: &str, contents: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "glimmer-registry-test-{}-{name}",
                std::process::id()
            ));
            fs::write(&path, contents).unwrap();
            Self { path }
        }

        fn rewrite(&self, contents: &str) {
            fs::write(&self.path, contents).unwrap();
        }

        fn sources(&self) -> ShaderSources {
            ShaderSources::Compute {
                path: self.path.clone(),
            }
        }
    }

    impl Drop for TempShader {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    #[test]
    fn register_valid_program() {
        let file = TempShader::new("register-ok.wgsl", VALID);
        let mut registry = ShaderRegistry::new();

        registry.register("path-tracer", file.sources()).unwrap();

        let entry = registry.get("path-tracer").unwrap();
        assert_eq!(entry.generation(), 1);
        assert!(entry.wgsl().contains("@compute"));
    }

    #[test]
    fn register_invalid_program_leaves_name_unset() {
        let file = TempShader::new("register-bad.wgsl", INVALID);
        let mut registry = ShaderRegistry::new();

        assert!(registry.register("path-tracer", file.sources()).is_err());
        assert!(registry.get("path-tracer").is_err());
    }

    #[test]
    fn reload_success_bumps_generation() {
        let file = TempShader::new("reload-ok.wgsl", VALID);
        let mut registry = ShaderRegistry::new();
        registry.register("path-tracer", file.sources()).unwrap();

        assert_eq!(registry.reload(&["path-tracer"]), 1);
        assert_eq!(registry.get("path-tracer").unwrap().generation(), 2);
    }

    #[test]
    fn reload_failure_keeps_previous_program() {
        let file = TempShader::new("reload-bad.wgsl", VALID);
        let mut registry = ShaderRegistry::new();
        registry.register("path-tracer", file.sources()).unwrap();
        let before = registry.get("path-tracer").unwrap().wgsl().to_owned();

        // Break the on-disk source, then attempt a reload.
        file.rewrite(INVALID);
        assert_eq!(registry.reload(&["path-tracer"]), 0);

        let entry = registry.get("path-tracer").unwrap();
        assert_eq!(entry.wgsl(), before);
        assert_eq!(entry.generation(), 1);
    }

    #[test]
    fn reload_unknown_name_is_skipped() {
        let mut registry = ShaderRegistry::new();
        assert_eq!(registry.reload(&["screen"]), 0);
    }

    #[test]
    fn reload_is_keyed_not_blanket() {
        let a = TempShader::new("keyed-a.wgsl", VALID);
        let b = TempShader::new("keyed-b.wgsl", VALID);
        let mut registry = ShaderRegistry::new();
        registry.register("path-tracer", a.sources()).unwrap();
        registry.register("screen", b.sources()).unwrap();

        assert_eq!(registry.reload(&["path-tracer"]), 1);

        assert_eq!(registry.get("path-tracer").unwrap().generation(), 2);
        assert_eq!(registry.get("screen").unwrap().generation(), 1);
    }

    #[test]
    fn unregistered_lookup_is_loud() {
        let registry = ShaderRegistry::new();
        let err = registry.get("screen").unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }
}
