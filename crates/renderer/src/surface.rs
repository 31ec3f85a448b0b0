//! The renderable surface: a loaded mesh plus its GPU buffers.

use asset::SurfaceMesh;
use corelib::{Camera, Mat4, Vec3};
use wgpu::{Device, Queue, RenderPass};

use crate::buffers::SurfaceBuffers;
use crate::shader::{RenderMode, SurfaceShader, SurfaceUniforms};

pub struct SurfaceRenderable {
    mesh: SurfaceMesh,
    buffers: SurfaceBuffers,
    light_pos: Vec3,
}

impl SurfaceRenderable {
    pub fn new(device: &Device, mesh: SurfaceMesh, light_pos: Vec3) -> Self {
        let buffers = SurfaceBuffers::new(device, &mesh);
        Self {
            mesh,
            buffers,
            light_pos,
        }
    }

    /// Camera looking at the mesh bounds from +Z.
    pub fn framing_camera(&self, aspect: f32) -> Camera {
        match self.mesh.bounds() {
            Some(b) => Camera::framing(Vec3::from(b.center()), b.radius(), aspect),
            None => Camera::framing(Vec3::ZERO, 1.0, aspect),
        }
    }

    /// The surface sits at the origin untransformed, so model-view is the view.
    pub fn uniforms(&self, projection: Mat4, camera: &Camera) -> SurfaceUniforms {
        SurfaceUniforms::new(
            projection,
            camera.view(),
            self.light_pos,
            self.mesh.read_normals,
        )
    }

    /// Set uniforms, re-upload every stream and record the indexed draw.
    pub fn render(
        &mut self,
        device: &Device,
        queue: &Queue,
        shader: &SurfaceShader,
        mode: RenderMode,
        camera: &Camera,
        rpass: &mut RenderPass<'_>,
    ) {
        shader.write_uniforms(queue, &self.uniforms(camera.proj(), camera));
        self.buffers.upload(device, queue, &self.mesh);

        rpass.set_pipeline(shader.pipeline(mode));
        rpass.set_bind_group(0, shader.bind_group(), &[]);
        self.buffers.draw(rpass);
    }
}
