use std::sync::Arc;

use wgpu::{Device, Queue, Surface, SurfaceConfiguration, TextureFormat};
use winit::window::Window;

pub mod camera;
pub mod error;
pub mod lighting;
pub mod uniforms;
pub mod mesh_pipeline;
pub mod leaf_pipeline;
pub mod scene_renderer;

pub use camera::{Camera, CameraController, CameraState};
pub use error::RenderError;
pub use lighting::{compute_lighting, LightingBand, LightingEnvironmentController, LightingState};
pub use uniforms::{SceneBindings, SceneUniforms};
pub use mesh_pipeline::MeshPipeline;
pub use leaf_pipeline::{LeafInstance, LeafPipeline};
pub use scene_renderer::{FrameView, GpuSceneRenderer, SceneRenderer};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Presentation state of one visualization: device, swapchain and depth view.
///
/// The surface holds the window alive.
pub struct GraphicsContext {
    device: Device,
    queue: Queue,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    depth_view: wgpu::TextureView,
}

impl GraphicsContext {
    /// Blocks on adapter and device requests. A missing adapter, device or
    /// usable surface format is an error, never a panic.
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        pollster::block_on(Self::connect(window))
    }

    async fn connect(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Adapter: {} ({:?})", adapter.get_info().name, adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Life Tree Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = pick_surface_format(&caps.formats).ok_or(RenderError::UnsupportedSurface)?;
        let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = surface_config(format, alpha_mode, size.width, size.height);
        surface.configure(&device, &config);
        let depth_view = depth_view(&device, &config);

        Ok(Self {
            device,
            queue,
            surface,
            config,
            depth_view,
        })
    }

    /// Next swapchain texture.
    ///
    /// Returns `Ok(None)` when the frame should be skipped: the surface was
    /// lost or outdated (it is reconfigured here) or timed out.
    pub fn acquire_frame(&mut self) -> Result<Option<wgpu::SurfaceTexture>, RenderError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out, skipping frame");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reconfigure for a new window size. Minimized (zero) sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config = surface_config(self.config.format, self.config.alpha_mode, width, height);
        self.surface.configure(&self.device, &self.config);
        self.depth_view = depth_view(&self.device, &self.config);
    }

    pub fn aspect_ratio(&self) -> f32 {
        config_aspect_ratio(&self.config)
    }

    pub fn config(&self) -> &SurfaceConfiguration {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.config.format
    }
}

/// First sRGB format, else whatever the surface lists first
fn pick_surface_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .copied()
        .find(TextureFormat::is_srgb)
        .or_else(|| formats.first().copied())
}

fn surface_config(
    format: TextureFormat,
    alpha_mode: wgpu::CompositeAlphaMode,
    width: u32,
    height: u32,
) -> SurfaceConfiguration {
    SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode,
        view_formats: Vec::new(),
        desired_maximum_frame_latency: 2,
    }
}

fn config_aspect_ratio(config: &SurfaceConfiguration) -> f32 {
    config.width as f32 / config.height.max(1) as f32
}

/// Depth attachment matching the swapchain size. The view keeps its texture alive.
fn depth_view(device: &Device, config: &SurfaceConfiguration) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}
