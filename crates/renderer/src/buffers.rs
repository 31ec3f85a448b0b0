//! GPU-side storage for a surface mesh: one buffer per attribute stream plus indices.
//!
//! Every frame the full contents are written again with `Queue::write_buffer`.
//! Meshes are small and static, so there is no dirty tracking.

use asset::SurfaceMesh;
use wgpu::{
    Buffer, BufferAddress, BufferDescriptor, BufferUsages, Device, IndexFormat, Queue, RenderPass,
    VertexBufferLayout, VertexStepMode,
};

/// Shader location of each vertex stream.
pub const POSITION_LOCATION: u32 = 0;
pub const COLOR_LOCATION: u32 = 1;
pub const NORMAL_LOCATION: u32 = 2;

const POSITION_STRIDE: BufferAddress = std::mem::size_of::<[f32; 3]>() as BufferAddress;
const COLOR_STRIDE: BufferAddress = std::mem::size_of::<[f32; 4]>() as BufferAddress;
const NORMAL_STRIDE: BufferAddress = std::mem::size_of::<[f32; 3]>() as BufferAddress;
const INDEX_STRIDE: BufferAddress = std::mem::size_of::<u32>() as BufferAddress;

/// Vertex buffer layouts, one slot per stream: position, color, normal.
pub const VERTEX_LAYOUTS: [VertexBufferLayout<'static>; 3] = [
    VertexBufferLayout {
        array_stride: POSITION_STRIDE,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![POSITION_LOCATION => Float32x3],
    },
    VertexBufferLayout {
        array_stride: COLOR_STRIDE,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![COLOR_LOCATION => Float32x4],
    },
    VertexBufferLayout {
        array_stride: NORMAL_STRIDE,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![NORMAL_LOCATION => Float32x3],
    },
];

/// Byte sizes of the four buffers backing a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSizes {
    pub positions: BufferAddress,
    pub colors: BufferAddress,
    pub normals: BufferAddress,
    pub indices: BufferAddress,
}

impl BufferSizes {
    pub fn for_mesh(mesh: &SurfaceMesh) -> Self {
        let vertices = mesh.vertex_count() as BufferAddress;
        Self {
            positions: padded(vertices * POSITION_STRIDE),
            colors: padded(vertices * COLOR_STRIDE),
            normals: padded(vertices * NORMAL_STRIDE),
            indices: padded(mesh.indices.len() as BufferAddress * INDEX_STRIDE),
        }
    }
}

/// Zero-sized buffers are not bindable; round up to the copy alignment.
fn padded(size: BufferAddress) -> BufferAddress {
    size.max(wgpu::COPY_BUFFER_ALIGNMENT)
        .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

pub struct SurfaceBuffers {
    positions: Buffer,
    colors: Buffer,
    normals: Buffer,
    indices: Buffer,
    sizes: BufferSizes,
    index_count: u32,
}

impl SurfaceBuffers {
    /// Allocate buffers sized for `mesh`. Contents are zero until the first upload.
    pub fn new(device: &Device, mesh: &SurfaceMesh) -> Self {
        let sizes = BufferSizes::for_mesh(mesh);
        log::debug!("Allocating surface buffers: {:?}", sizes);
        Self {
            positions: create_buffer(device, "Surface positions", sizes.positions, BufferUsages::VERTEX),
            colors: create_buffer(device, "Surface colors", sizes.colors, BufferUsages::VERTEX),
            normals: create_buffer(device, "Surface normals", sizes.normals, BufferUsages::VERTEX),
            indices: create_buffer(device, "Surface indices", sizes.indices, BufferUsages::INDEX),
            sizes,
            index_count: 0,
        }
    }

    /// Write the whole mesh to the GPU. Normals are written only when the
    /// mesh asks for them.
    pub fn upload(&mut self, device: &Device, queue: &Queue, mesh: &SurfaceMesh) {
        let wanted = BufferSizes::for_mesh(mesh);
        if wanted != self.sizes {
            *self = Self::new(device, mesh);
        }

        write(queue, &self.positions, bytemuck::cast_slice(&mesh.vertices));
        write(queue, &self.colors, bytemuck::cast_slice(&mesh.colors));
        if mesh.read_normals {
            let normals = mesh.normals_for_upload();
            write(queue, &self.normals, bytemuck::cast_slice(&normals));
        }
        write(queue, &self.indices, bytemuck::cast_slice(&mesh.indices));

        self.index_count = mesh.indices.len() as u32;
    }

    /// Bind all streams and issue one indexed draw.
    pub fn draw(&self, rpass: &mut RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        rpass.set_vertex_buffer(0, self.positions.slice(..));
        rpass.set_vertex_buffer(1, self.colors.slice(..));
        rpass.set_vertex_buffer(2, self.normals.slice(..));
        rpass.set_index_buffer(self.indices.slice(..), IndexFormat::Uint32);
        rpass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn create_buffer(device: &Device, label: &str, size: BufferAddress, usage: BufferUsages) -> Buffer {
    device.create_buffer(&BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn write(queue: &Queue, buffer: &Buffer, bytes: &[u8]) {
    if !bytes.is_empty() {
        queue.write_buffer(buffer, 0, bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh_gets_minimal_buffers() {
        let sizes = BufferSizes::for_mesh(&SurfaceMesh::new());
        assert_eq!(sizes.positions, wgpu::COPY_BUFFER_ALIGNMENT);
        assert_eq!(sizes.colors, wgpu::COPY_BUFFER_ALIGNMENT);
        assert_eq!(sizes.normals, wgpu::COPY_BUFFER_ALIGNMENT);
        assert_eq!(sizes.indices, wgpu::COPY_BUFFER_ALIGNMENT);
    }

    #[test]
    fn sizes_follow_stream_strides() {
        let mesh = asset::load_obj_from_str("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n")
            .unwrap();
        let sizes = BufferSizes::for_mesh(&mesh);
        assert_eq!(sizes.positions, 4 * 12);
        assert_eq!(sizes.colors, 4 * 16);
        assert_eq!(sizes.normals, 4 * 12);
        assert_eq!(sizes.indices, 6 * 4);
        for s in [sizes.positions, sizes.colors, sizes.normals, sizes.indices] {
            assert_eq!(s % wgpu::COPY_BUFFER_ALIGNMENT, 0);
        }
    }

    #[test]
    fn layouts_use_fixed_locations() {
        let locations: Vec<(u32, wgpu::VertexFormat)> = VERTEX_LAYOUTS
            .iter()
            .flat_map(|l| l.attributes.iter().map(|a| (a.shader_location, a.format)))
            .collect();
        assert_eq!(
            locations,
            vec![
                (0, wgpu::VertexFormat::Float32x3),
                (1, wgpu::VertexFormat::Float32x4),
                (2, wgpu::VertexFormat::Float32x3),
            ]
        );
        assert_eq!(VERTEX_LAYOUTS[1].array_stride, 16);
    }
}
