//! Core types: math re-exports and the viewing camera.

pub use glam::{Mat4, Vec3, vec3};

pub mod camera;

pub use camera::Camera;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_pv_is_finite() {
        let cam = Camera::framing(vec3(0.0, 0.0, 0.0), 2.0, 16.0 / 9.0);
        let pv = (cam.proj() * cam.view()).to_cols_array();
        assert!(pv.iter().all(|f| f.is_finite()));
    }
}
