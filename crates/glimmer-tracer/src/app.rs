use std::path::Path;

use anyhow::Result;

use glimmer_engine::core::{App, AppControl, FrameCtx};
use glimmer_engine::device::SurfaceErrorAction;
use glimmer_engine::input::Key;
use glimmer_engine::render::{BlitPass, PathTracePass, PresentImage, ResizePolicy};
use glimmer_engine::shader::{ShaderRegistry, ShaderSources};

/// Shader sources are resolved relative to the working directory.
const SHADER_DIR: &str = "shaders";

const PATH_TRACER: &str = "path-tracer";
const SCREEN: &str = "screen";

/// The one key binding of the harness.
const RELOAD_KEY: Key = Key::H;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.2,
    a: 1.0,
};

/// The path-tracer application: owns the shader registry, the presentation
/// image, and the two passes that make a frame.
pub struct TracerApp {
    registry: ShaderRegistry,
    image: Option<PresentImage>,
    pathtrace: PathTracePass,
    blit: BlitPass,
    resize_policy: ResizePolicy,
}

impl TracerApp {
    /// Registers the initial programs. Errors here are fatal; rendering
    /// cannot proceed without valid programs.
    pub fn new() -> Result<Self> {
        let dir = Path::new(SHADER_DIR);
        let mut registry = ShaderRegistry::new();

        registry.register(
            PATH_TRACER,
            ShaderSources::Compute {
                path: dir.join("path_tracer.wgsl"),
            },
        )?;
        registry.register(
            SCREEN,
            ShaderSources::Render {
                vertex: dir.join("screen.vert.wgsl"),
                fragment: dir.join("screen.frag.wgsl"),
            },
        )?;

        Ok(Self {
            registry,
            image: None,
            pathtrace: PathTracePass::new(),
            blit: BlitPass::new(),
            resize_policy: ResizePolicy::TrackSurface,
        })
    }
}

impl App for TracerApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        // Hot-reload on the designated key, edge-triggered. A failed reload
        // logs and leaves the previous programs active; stale pipelines keep
        // rendering because the registry generations do not change.
        if ctx.input_frame.pressed(RELOAD_KEY) {
            log::info!("hot-reloading shaders");
            let _ = self.registry.reload(&[PATH_TRACER, SCREEN]);
        }

        let size = ctx.gpu.size();
        if size.width == 0 || size.height == 0 {
            // Minimized; nothing to render.
            return AppControl::Continue;
        }

        let image = self
            .image
            .get_or_insert_with(|| PresentImage::new(ctx.gpu.device(), size, self.resize_policy));
        image.ensure_size(ctx.gpu.device(), size);

        // Trace into the image and wait for completion; the measured
        // dispatch+wait time goes to the window title as a diagnostic.
        match self
            .pathtrace
            .run(ctx.gpu, &self.registry, image, ctx.time.elapsed)
        {
            Ok(duration) => {
                ctx.window.set_title(&format!(
                    "glimmer | path trace: {:.3} ms",
                    duration.as_secs_f64() * 1000.0
                ));
            }
            Err(e) => {
                log::error!("path trace pass failed: {e:#}");
                return AppControl::Continue;
            }
        }

        // Present the image via the fullscreen blit.
        let mut frame = match ctx.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match ctx.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        AppControl::Continue
                    }
                };
            }
        };

        if let Err(e) = self
            .blit
            .run(ctx.gpu, &self.registry, image, &mut frame, CLEAR_COLOR)
        {
            log::error!("blit pass failed: {e:#}");
        }

        ctx.gpu.submit(frame);

        AppControl::Continue
    }
}
