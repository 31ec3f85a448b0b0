//! CPU-side surface mesh produced by the OBJ loader.

/// Color assigned to every vertex that does not carry its own.
pub const DEFAULT_VERTEX_COLOR: [f32; 4] = [0.6, 0.6, 0.6, 0.5];

/// Axis-aligned bounding box in object space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    pub fn center(&self) -> [f32; 3] {
        [
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[2] + self.max[2]),
        ]
    }

    /// Half of the box diagonal.
    pub fn radius(&self) -> f32 {
        let dx = self.max[0] - self.min[0];
        let dy = self.max[1] - self.min[1];
        let dz = self.max[2] - self.min[2];
        0.5 * (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Indexed triangle surface stored as parallel attribute streams.
///
/// `colors` always has one entry per vertex. `normals` is only filled when the
/// source declared normals, which also raises `read_normals`. When faces name
/// normal indices it is already one entry per vertex; otherwise it holds the
/// `vn` vectors in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub read_normals: bool,
}

impl SurfaceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex together with its color, keeping both streams parallel.
    pub fn push_vertex(&mut self, position: [f32; 3], color: [f32; 4]) {
        self.vertices.push(position);
        self.colors.push(color);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// `true` if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = *self.vertices.first()?;
        let mut b = Bounds {
            min: first,
            max: first,
        };
        for v in &self.vertices[1..] {
            for axis in 0..3 {
                b.min[axis] = b.min[axis].min(v[axis]);
                b.max[axis] = b.max[axis].max(v[axis]);
            }
        }
        Some(b)
    }

    /// Normals stretched to exactly one per vertex for the GPU stream.
    /// Missing entries are zero; surplus entries are dropped.
    pub fn normals_for_upload(&self) -> Vec<[f32; 3]> {
        let mut out = vec![[0.0; 3]; self.vertices.len()];
        for (dst, src) in out.iter_mut().zip(&self.normals) {
            *dst = *src;
        }
        out
    }
}
