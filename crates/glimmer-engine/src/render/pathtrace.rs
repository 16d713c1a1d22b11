use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};

use crate::device::Gpu;
use crate::shader::{ShaderEntry, ShaderRegistry};

use super::image::PresentImage;

/// Compute tile edge, matching the shader's `@workgroup_size(8, 8, 1)`.
pub const TILE_SIZE: u32 = 8;

/// Registry name of the compute program this pass runs.
const PROGRAM: &str = "path-tracer";

/// Workgroup grid covering a `width`x`height` image with 8x8 tiles.
///
/// Rounds up so partial tiles at the right/bottom edges are covered; the
/// shader guards out-of-bounds texels.
pub fn dispatch_extent(width: u32, height: u32) -> (u32, u32, u32) {
    (width.div_ceil(TILE_SIZE), height.div_ceil(TILE_SIZE), 1)
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct TimeUniform {
    time: f32,
    _pad: [f32; 3], // 16-byte alignment
}

/// Path-tracer compute pass.
///
/// Dispatches the registered `path-tracer` program over the presentation
/// image and waits for completion, returning the measured dispatch+wait
/// wall time. The pipeline is rebuilt when the registry entry's generation
/// changes (hot-reload); the bind group is rebuilt when the image is
/// reallocated.
#[derive(Default)]
pub struct PathTracePass {
    pipeline: Option<wgpu::ComputePipeline>,
    pipeline_generation: u64,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    bound_image_generation: u64,

    time_ubo: Option<wgpu::Buffer>,
}

impl PathTracePass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one dispatch covering `image`, blocking until the GPU finishes.
    ///
    /// `time_seconds` is the monotonic elapsed time uploaded to the shader's
    /// `time` uniform.
    pub fn run(
        &mut self,
        gpu: &Gpu<'_>,
        registry: &ShaderRegistry,
        image: &PresentImage,
        time_seconds: f32,
    ) -> Result<Duration> {
        let entry = registry.get(PROGRAM)?;

        self.ensure_pipeline(gpu.device(), entry);
        self.ensure_bindings(gpu.device(), image);

        let (pipeline, bind_group, time_ubo) = match (
            self.pipeline.as_ref(),
            self.bind_group.as_ref(),
            self.time_ubo.as_ref(),
        ) {
            (Some(p), Some(b), Some(t)) => (p, b, t),
            _ => anyhow::bail!("path-trace pass resources missing after ensure"),
        };

        gpu.queue().write_buffer(
            time_ubo,
            0,
            bytemuck::bytes_of(&TimeUniform {
                time: time_seconds,
                _pad: [0.0; 3],
            }),
        );

        let started = Instant::now();

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glimmer path trace encoder"),
            });

        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("glimmer path trace pass"),
                timestamp_writes: None,
            });

            let size = image.size();
            let (gx, gy, gz) = dispatch_extent(size.width, size.height);

            cpass.set_pipeline(pipeline);
            cpass.set_bind_group(0, bind_group, &[]);
            cpass.dispatch_workgroups(gx, gy, gz);
        }

        let _ = gpu.queue().submit(std::iter::once(encoder.finish()));

        // Intentional synchronous stall: one full-screen dispatch per frame,
        // timed as a diagnostic. The storage-write -> texture-sample ordering
        // for the following blit is handled by wgpu's usage transitions.
        let _ = gpu
            .device()
            .poll(wgpu::PollType::wait_indefinitely())
            .context("waiting for path trace dispatch")?;

        Ok(started.elapsed())
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, entry: &ShaderEntry) {
        if self.pipeline.is_some() && self.pipeline_generation == entry.generation() {
            return;
        }

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glimmer path tracer shader"),
            source: wgpu::ShaderSource::Wgsl(entry.wgsl().into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("glimmer path trace bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: PresentImage::FORMAT,
                            view_dimension: wgpu::TextureViewDimension::D2,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: std::num::NonZeroU64::new(
                                std::mem::size_of::<TimeUniform>() as u64,
                            ),
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glimmer path trace pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("glimmer path trace pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        self.pipeline = Some(pipeline);
        self.pipeline_generation = entry.generation();
        self.bind_group_layout = Some(bind_group_layout);

        // Layout identity changed; the old bind group no longer applies.
        self.bind_group = None;
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device, image: &PresentImage) {
        if self.bind_group.is_some() && self.bound_image_generation == image.generation() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else {
            return;
        };

        let time_ubo = self.time_ubo.get_or_insert_with(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("glimmer time ubo"),
                size: std::mem::size_of::<TimeUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glimmer path trace bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(image.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: time_ubo.as_entire_binding(),
                },
            ],
        });

        self.bind_group = Some(bind_group);
        self.bound_image_generation = image.generation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_texel_needs_one_tile() {
        assert_eq!(dispatch_extent(1, 1), (1, 1, 1));
    }

    #[test]
    fn exact_tile_fit() {
        assert_eq!(dispatch_extent(8, 8), (1, 1, 1));
    }

    #[test]
    fn partial_tile_rounds_up() {
        assert_eq!(dispatch_extent(9, 8), (2, 1, 1));
    }

    #[test]
    fn startup_resolution() {
        assert_eq!(dispatch_extent(800, 700), (100, 88, 1));
    }

    #[test]
    fn grid_covers_every_texel() {
        for (w, h) in [(1, 1), (7, 13), (8, 8), (9, 8), (800, 700), (1920, 1081)] {
            let (gx, gy, gz) = dispatch_extent(w, h);
            assert!(gx * TILE_SIZE >= w);
            assert!(gy * TILE_SIZE >= h);
            assert!((gx - 1) * TILE_SIZE < w, "grid overshoots in x for {w}x{h}");
            assert!((gy - 1) * TILE_SIZE < h, "grid overshoots in y for {w}x{h}");
            assert_eq!(gz, 1);
        }
    }
}
