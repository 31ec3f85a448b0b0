//! Renderer: wgpu device/surface + depth + the surface mesh draw.
//! wgpu = 26.x, winit = 0.30.x

pub mod buffers;
pub mod error;
pub mod shader;
pub mod surface;

use std::path::PathBuf;
use std::sync::Arc;

use asset::SurfaceMesh;
use corelib::Vec3;
use wgpu::{
    CommandEncoderDescriptor, Device, DeviceDescriptor, Extent3d, Features, Instance,
    InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use error::{RenderError, RenderResult};
pub use shader::{DEPTH_FORMAT, RenderMode, SurfaceUniforms};
pub use surface::SurfaceRenderable;

use shader::SurfaceShader;

/// Light position used when none is configured.
pub const DEFAULT_LIGHT_POS: [f32; 3] = [0.0, -4.0, -10.0];

/// Startup options for [`GpuState`].
#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub backends: wgpu::Backends,
    pub render_mode: RenderMode,
    pub shader_path: Option<PathBuf>,
    pub light_pos: [f32; 3],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            render_mode: RenderMode::default(),
            shader_path: None,
            light_pos: DEFAULT_LIGHT_POS,
        }
    }
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Program & geometry
    shader: SurfaceShader,
    renderable: SurfaceRenderable,
    mode: RenderMode,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window> and take ownership of `mesh`.
    pub async fn new(
        window: Arc<Window>,
        mesh: SurfaceMesh,
        config: &RendererConfig,
    ) -> RenderResult<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Shader source is read first so a bad path fails before touching the GPU.
        let shader_src = shader::load_shader_source(config.shader_path.as_deref())?;

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?})", info.name, info.backend);

        // Line rasterization is optional; request it only where available.
        let required_features = adapter.features() & Features::POLYGON_MODE_LINE;

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Surfview Device"),
                required_features,
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or_default(),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        let origin = shader::shader_origin(config.shader_path.as_deref());
        let shader = SurfaceShader::new(&device, surface_format, shader_src, &origin).await?;
        let renderable = SurfaceRenderable::new(&device, mesh, Vec3::from(config.light_pos));

        let lines = shader.supports(RenderMode::Wireframe);
        let mode = effective_mode(config.render_mode, lines);
        if let Some(fallback) = fallback_for(config.render_mode, lines) {
            log::warn!(
                "Adapter lacks POLYGON_MODE_LINE; {:?} falls back to {:?}",
                config.render_mode,
                fallback
            );
        }
        log::info!("Render mode: {:?}", mode);

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            shader,
            renderable,
            mode,
            depth_view,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Switch between wireframe and filled. Returns the mode now in effect.
    pub fn toggle_mode(&mut self) -> RenderMode {
        let wanted = self.mode.toggled();
        self.mode = effective_mode(wanted, self.shader.supports(RenderMode::Wireframe));
        if self.mode != wanted {
            log::warn!("{:?} mode unavailable on this device", wanted);
        } else {
            log::info!("Render mode: {:?}", self.mode);
        }
        self.mode
    }

    /// Render one frame: clear + upload + draw the surface.
    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let aspect = self.width as f32 / self.height as f32;
        let camera = self.renderable.framing_camera(aspect);

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.renderable.render(
                &self.device,
                &self.queue,
                &self.shader,
                self.mode,
                &camera,
                &mut rpass,
            );
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// `Some(mode)` only when `wanted` cannot be honoured and `mode` is used instead.
fn fallback_for(wanted: RenderMode, lines_supported: bool) -> Option<RenderMode> {
    let mode = effective_mode(wanted, lines_supported);
    (mode != wanted).then_some(mode)
}

/// Mode actually used given whether line rasterization is available.
fn effective_mode(wanted: RenderMode, lines_supported: bool) -> RenderMode {
    match wanted {
        RenderMode::Wireframe if !lines_supported => RenderMode::Filled,
        other => other,
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
