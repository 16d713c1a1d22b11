use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::device::{Gpu, GpuFrame};
use crate::shader::{ShaderEntry, ShaderRegistry};

use super::image::PresentImage;

/// Registry name of the render program this pass draws with.
const PROGRAM: &str = "screen";

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    pos: [f32; 2], // NDC
    uv: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Two CCW triangles covering the full screen, UVs spanning [0,1] with v=0
/// at the top so the image is not flipped on present.
const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { pos: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { pos: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { pos: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { pos: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { pos: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { pos: [-1.0, 1.0], uv: [0.0, 0.0] },
];

/// Fullscreen blit pass.
///
/// Clears the swapchain view and draws the presentation image over it with
/// the registered `screen` program. The pipeline carries no depth/stencil
/// state and no culling; it is a 2D blit, so later frames see no leftover
/// raster state to restore.
#[derive(Default)]
pub struct BlitPass {
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_generation: u64,
    pipeline_format: Option<wgpu::TextureFormat>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    bound_image_generation: u64,

    sampler: Option<wgpu::Sampler>,
    quad_vbo: Option<wgpu::Buffer>,
}

impl BlitPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the clear+blit render pass into `frame`'s encoder.
    pub fn run(
        &mut self,
        gpu: &Gpu<'_>,
        registry: &ShaderRegistry,
        image: &PresentImage,
        frame: &mut GpuFrame,
        clear: wgpu::Color,
    ) -> Result<()> {
        let entry = registry.get(PROGRAM)?;

        self.ensure_pipeline(gpu.device(), gpu.surface_format(), entry);
        self.ensure_bindings(gpu.device(), image);
        self.ensure_quad(gpu.device());

        let (pipeline, bind_group, quad_vbo) = match (
            self.pipeline.as_ref(),
            self.bind_group.as_ref(),
            self.quad_vbo.as_ref(),
        ) {
            (Some(p), Some(b), Some(q)) => (p, b, q),
            _ => anyhow::bail!("blit pass resources missing after ensure"),
        };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("glimmer blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.draw(0..QUAD_VERTICES.len() as u32, 0..1);

        Ok(())
    }

    fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        entry: &ShaderEntry,
    ) {
        if self.pipeline.is_some()
            && self.pipeline_generation == entry.generation()
            && self.pipeline_format == Some(format)
        {
            return;
        }

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glimmer screen shader"),
            source: wgpu::ShaderSource::Wgsl(entry.wgsl().into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("glimmer blit bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glimmer blit pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("glimmer blit pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline = Some(pipeline);
        self.pipeline_generation = entry.generation();
        self.pipeline_format = Some(format);
        self.bind_group_layout = Some(bind_group_layout);

        self.bind_group = None;
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device, image: &PresentImage) {
        if self.bind_group.is_some() && self.bound_image_generation == image.generation() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else {
            return;
        };

        let sampler = self.sampler.get_or_insert_with(|| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("glimmer blit sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            })
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glimmer blit bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(image.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        self.bind_group = Some(bind_group);
        self.bound_image_generation = image.generation();
    }

    fn ensure_quad(&mut self, device: &wgpu::Device) {
        if self.quad_vbo.is_some() {
            return;
        }

        self.quad_vbo = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glimmer quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_is_two_triangles() {
        assert_eq!(QUAD_VERTICES.len(), 6);
    }

    #[test]
    fn quad_spans_full_ndc_range() {
        let xs: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.pos[0]).collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.pos[1]).collect();
        assert!(xs.iter().all(|x| *x == -1.0 || *x == 1.0));
        assert!(ys.iter().all(|y| *y == -1.0 || *y == 1.0));
        assert!(xs.contains(&-1.0) && xs.contains(&1.0));
        assert!(ys.contains(&-1.0) && ys.contains(&1.0));
    }

    #[test]
    fn quad_uvs_span_unit_square() {
        for v in &QUAD_VERTICES {
            assert!(v.uv[0] == 0.0 || v.uv[0] == 1.0);
            assert!(v.uv[1] == 0.0 || v.uv[1] == 1.0);
        }
        // All four corners appear.
        for corner in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] {
            assert!(QUAD_VERTICES.iter().any(|v| v.uv == corner));
        }
    }

    #[test]
    fn quad_winding_is_ccw() {
        // Signed area of each triangle in NDC (y up) must be positive.
        for tri in QUAD_VERTICES.chunks(3) {
            let [a, b, c] = [tri[0].pos, tri[1].pos, tri[2].pos];
            let area = (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1]);
            assert!(area > 0.0);
        }
    }
}
