//! A look-at camera with a perspective projection.

use cgmath::{Deg, Matrix4, Point3, Vector3, perspective};

/// Converts the OpenGL clip space depth range (-1..1) to wgpu's (0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::from_cols(
    cgmath::Vector4::new(1.0, 0.0, 0.0, 0.0),
    cgmath::Vector4::new(0.0, 1.0, 0.0, 0.0),
    cgmath::Vector4::new(0.0, 0.0, 0.5, 0.0),
    cgmath::Vector4::new(0.0, 0.0, 0.5, 1.0),
);

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub aspect: f32,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(position: Point3<f32>, target: Point3<f32>, aspect: f32) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
            aspect,
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 500.0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{EuclideanSpace, Vector4};

    use super::*;

    #[test]
    fn target_lands_in_the_middle_of_the_screen() {
        let camera = Camera::new(Point3::new(0.0, 5.0, 10.0), Point3::origin(), 16.0 / 9.0);
        let clip = camera.projection() * camera.view() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn resize_ignores_minimised_window() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 1.0), Point3::origin(), 1.0);
        camera.resize(0, 600);
        assert_eq!(camera.aspect, 1.0);
        camera.resize(800, 400);
        assert_eq!(camera.aspect, 2.0);
    }
}
