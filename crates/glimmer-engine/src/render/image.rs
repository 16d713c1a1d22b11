use winit::dpi::PhysicalSize;

/// Whether the presentation image follows the surface size.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResizePolicy {
    /// Keep the startup resolution; the blit scales to the window.
    Fixed,
    /// Reallocate the image whenever the surface size changes.
    TrackSurface,
}

/// GPU-resident RGBA8 image written by the path-trace dispatch and sampled
/// by the blit pass.
///
/// The generation counter changes on reallocation so passes know to rebuild
/// bind groups that reference the old texture view.
pub struct PresentImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: PhysicalSize<u32>,
    policy: ResizePolicy,
    generation: u64,
}

impl PresentImage {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>, policy: ResizePolicy) -> Self {
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        let (texture, view) = create_texture(device, size);
        Self {
            texture,
            view,
            size,
            policy,
            generation: 1,
        }
    }

    /// Reallocates the image if the policy says it should track `surface`.
    ///
    /// Zero-sized surfaces (minimized window) never trigger reallocation.
    pub fn ensure_size(&mut self, device: &wgpu::Device, surface: PhysicalSize<u32>) {
        if !needs_realloc(self.policy, self.size, surface) {
            return;
        }

        log::debug!(
            "presentation image {}x{} -> {}x{}",
            self.size.width,
            self.size.height,
            surface.width,
            surface.height
        );

        self.texture.destroy();
        let (texture, view) = create_texture(device, surface);
        self.texture = texture;
        self.view = view;
        self.size = surface;
        self.generation += 1;
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Reallocation decision, split out so the policy is testable without a
/// device.
fn needs_realloc(
    policy: ResizePolicy,
    current: PhysicalSize<u32>,
    surface: PhysicalSize<u32>,
) -> bool {
    match policy {
        ResizePolicy::Fixed => false,
        ResizePolicy::TrackSurface => {
            surface.width > 0 && surface.height > 0 && surface != current
        }
    }
}

fn create_texture(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("glimmer present image"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PresentImage::FORMAT,
        // Written by the compute stage, sampled by the blit stage.
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: u32, h: u32) -> PhysicalSize<u32> {
        PhysicalSize::new(w, h)
    }

    #[test]
    fn fixed_policy_never_reallocates() {
        assert!(!needs_realloc(ResizePolicy::Fixed, size(800, 700), size(1920, 1080)));
    }

    #[test]
    fn tracking_policy_reallocates_on_mismatch() {
        assert!(needs_realloc(ResizePolicy::TrackSurface, size(800, 700), size(801, 700)));
    }

    #[test]
    fn tracking_policy_is_idle_when_sizes_match() {
        assert!(!needs_realloc(ResizePolicy::TrackSurface, size(800, 700), size(800, 700)));
    }

    #[test]
    fn minimized_surface_never_reallocates() {
        assert!(!needs_realloc(ResizePolicy::TrackSurface, size(800, 700), size(0, 0)));
        assert!(!needs_realloc(ResizePolicy::TrackSurface, size(800, 700), size(800, 0)));
    }
}
