//! Surface shader program: WGSL source, uniform block and the two pipelines
//! (filled and wireframe) that share it.

use std::{borrow::Cow, num::NonZeroU64, path::Path};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::{
    BindGroup, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState, Buffer,
    BufferBindingType, BufferUsages, ColorTargetState, ColorWrites, DepthBiasState,
    DepthStencilState, Device, FragmentState, PipelineLayoutDescriptor, PolygonMode, Queue,
    RenderPipeline, RenderPipelineDescriptor, ShaderModule, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, TextureFormat, VertexState, util::DeviceExt,
};

use crate::buffers::VERTEX_LAYOUTS;
use crate::error::{RenderError, RenderResult};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const EMBEDDED_SOURCE: &str = include_str!("shaders/surface.wgsl");

/// Uniform block matching `SurfaceUniforms` in `surface.wgsl` (144 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SurfaceUniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
    pub light_pos: [f32; 3],
    pub read_normals: u32,
}

impl SurfaceUniforms {
    pub fn new(projection: Mat4, model_view: Mat4, light_pos: Vec3, read_normals: bool) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            model_view: model_view.to_cols_array_2d(),
            light_pos: light_pos.to_array(),
            read_normals: read_normals as u32,
        }
    }
}

/// How triangles are rasterized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Wireframe,
    Filled,
}

impl RenderMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "wireframe" | "wire" | "line" | "lines" => Some(Self::Wireframe),
            "filled" | "fill" | "solid" => Some(Self::Filled),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Wireframe => Self::Filled,
            Self::Filled => Self::Wireframe,
        }
    }

    fn polygon_mode(self) -> PolygonMode {
        match self {
            Self::Wireframe => PolygonMode::Line,
            Self::Filled => PolygonMode::Fill,
        }
    }
}

/// WGSL text for the surface shader: the file at `path` if given, else the
/// built-in source.
pub fn load_shader_source(path: Option<&Path>) -> RenderResult<Cow<'static, str>> {
    match path {
        None => Ok(Cow::Borrowed(EMBEDDED_SOURCE)),
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| RenderError::ShaderRead {
                path: path.to_path_buf(),
                source,
            })?;
            log::info!("Using shader source from {}", path.display());
            Ok(Cow::Owned(text))
        }
    }
}

/// Human-readable name of a shader source for error messages.
pub fn shader_origin(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<built-in surface.wgsl>".to_string(),
    }
}

pub struct SurfaceShader {
    uniform_buf: Buffer,
    bind_group: BindGroup,
    filled: RenderPipeline,
    wireframe: Option<RenderPipeline>,
}

impl SurfaceShader {
    /// Compile the program and build pipelines. The wireframe pipeline only
    /// exists when the device was created with `POLYGON_MODE_LINE`.
    ///
    /// Validation failures (bad WGSL, mismatched interface) are captured in an
    /// error scope and returned instead of reaching the device's panic handler.
    pub async fn new(
        device: &Device,
        color_format: TextureFormat,
        source: Cow<'static, str>,
        origin: &str,
    ) -> RenderResult<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Surface WGSL"),
            source: ShaderSource::Wgsl(source),
        });

        let bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Surface BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<SurfaceUniforms>() as u64),
                },
                count: None,
            }],
        });

        let uniform_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface UBO"),
            contents: bytemuck::bytes_of(&SurfaceUniforms::new(
                Mat4::IDENTITY,
                Mat4::IDENTITY,
                Vec3::ZERO,
                false,
            )),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Surface BG"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buf.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Surface PipelineLayout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let filled = create_pipeline(device, &layout, &module, color_format, RenderMode::Filled);
        let wireframe = device
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE)
            .then(|| create_pipeline(device, &layout, &module, color_format, RenderMode::Wireframe));

        if let Some(err) = device.pop_error_scope().await {
            return Err(RenderError::ShaderCompile {
                origin: origin.to_string(),
                message: err.to_string(),
            });
        }

        Ok(Self {
            uniform_buf,
            bind_group,
            filled,
            wireframe,
        })
    }

    pub fn supports(&self, mode: RenderMode) -> bool {
        match mode {
            RenderMode::Filled => true,
            RenderMode::Wireframe => self.wireframe.is_some(),
        }
    }

    /// Pipeline for `mode`, falling back to filled when lines are unavailable.
    pub fn pipeline(&self, mode: RenderMode) -> &RenderPipeline {
        match mode {
            RenderMode::Wireframe => self.wireframe.as_ref().unwrap_or(&self.filled),
            RenderMode::Filled => &self.filled,
        }
    }

    pub fn bind_group(&self) -> &BindGroup {
        &self.bind_group
    }

    pub fn write_uniforms(&self, queue: &Queue, uniforms: &SurfaceUniforms) {
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(uniforms));
    }
}

fn create_pipeline(
    device: &Device,
    layout: &wgpu::PipelineLayout,
    module: &ShaderModule,
    color_format: TextureFormat,
    mode: RenderMode,
) -> RenderPipeline {
    let label = match mode {
        RenderMode::Wireframe => "Surface Pipeline (wireframe)",
        RenderMode::Filled => "Surface Pipeline (filled)",
    };
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &VERTEX_LAYOUTS,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: color_format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            // OBJ winding is not reliable; draw both sides.
            cull_mode: None,
            polygon_mode: mode.polygon_mode(),
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<SurfaceUniforms>(), 144);
        assert_eq!(std::mem::offset_of!(SurfaceUniforms, model_view), 64);
        assert_eq!(std::mem::offset_of!(SurfaceUniforms, light_pos), 128);
        assert_eq!(std::mem::offset_of!(SurfaceUniforms, read_normals), 140);
    }

    #[test]
    fn uniforms_pack_flag_and_light() {
        let u = SurfaceUniforms::new(
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            Vec3::new(0.0, -4.0, -10.0),
            true,
        );
        assert_eq!(u.read_normals, 1);
        assert_eq!(u.light_pos, [0.0, -4.0, -10.0]);
        assert_eq!(u.model_view[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn render_mode_names_and_toggle() {
        assert_eq!(RenderMode::default(), RenderMode::Wireframe);
        assert_eq!(RenderMode::from_name("FILLED"), Some(RenderMode::Filled));
        assert_eq!(RenderMode::from_name("wireframe"), Some(RenderMode::Wireframe));
        assert_eq!(RenderMode::from_name("points"), None);
        assert_eq!(RenderMode::Wireframe.toggled(), RenderMode::Filled);
    }

    #[test]
    fn embedded_source_declares_entry_points() {
        let src = load_shader_source(None).unwrap();
        assert!(src.contains("fn vs_main"));
        assert!(src.contains("fn fs_main"));
        assert!(src.contains("read_normals"));
    }

    #[test]
    fn compile_errors_name_the_source() {
        let origin = shader_origin(Some(Path::new("shaders/broken.wgsl")));
        let err = RenderError::ShaderCompile {
            origin,
            message: "expected global item".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("shaders/broken.wgsl"));
        assert!(text.contains("expected global item"));
        assert_eq!(shader_origin(None), "<built-in surface.wgsl>");
    }

    #[test]
    fn missing_shader_file_is_an_error() {
        let err = load_shader_source(Some(Path::new("/no/such/shader.wgsl"))).unwrap_err();
        assert!(matches!(err, RenderError::ShaderRead { .. }));
        assert!(err.to_string().contains("/no/such/shader.wgsl"));
    }
}
