use crate::{Mat4, Vec3};

/// Vertical field of view used when framing a mesh.
pub const DEFAULT_FOV_Y_DEG: f32 = 45.0;

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    /// Camera on the +Z side of `center` far enough to see a sphere of `radius`.
    pub fn framing(center: Vec3, radius: f32, aspect: f32) -> Self {
        let radius = if radius.is_finite() && radius > 1e-4 {
            radius
        } else {
            1.0
        };
        let fov_y_rad = DEFAULT_FOV_Y_DEG.to_radians();
        let distance = radius / (0.5 * fov_y_rad).sin();
        Self::new_perspective(
            center + Vec3::Z * distance,
            center,
            Vec3::Y,
            fov_y_rad,
            (distance - radius).max(distance * 1e-3),
            distance + radius * 2.0,
            aspect,
        )
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth maps to [0, 1], matching wgpu clip space.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }
}
