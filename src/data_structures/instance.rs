//! Instance transformation data for GPU rendering.
//!
//! Every placed copy of a mesh carries its own position, rotation and scale.
//! The combined model matrix is kept in sync with those fields and packed
//! into the model's instance buffer as one row per instance.

use std::mem;

use cgmath::{Deg, ElementWise, InnerSpace, SquareMatrix};

use crate::data_structures::vertex::Vertex;

/// Per-instance transformation: position, rotation (axis + angle in degrees), and scale.
///
/// The derived `transform` is always `T(position) * R(angle, axis) * S(scale)`.
/// Every setter recomputes it before returning, so it never lags behind the fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    position: cgmath::Vector3<f32>,
    scale: cgmath::Vector3<f32>,
    rotation_axis: cgmath::Vector3<f32>,
    rotation_angle: Deg<f32>,
    transform: cgmath::Matrix4<f32>,
}

impl Instance {
    /// Create a new instance at the origin with unit scale and no rotation (0° about +Y).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
            rotation_axis: cgmath::Vector3::unit_y(),
            rotation_angle: Deg(0.0),
            transform: cgmath::Matrix4::identity(),
        }
    }

    pub fn position(&self) -> cgmath::Vector3<f32> {
        self.position
    }

    pub fn scale(&self) -> cgmath::Vector3<f32> {
        self.scale
    }

    pub fn rotation_axis(&self) -> cgmath::Vector3<f32> {
        self.rotation_axis
    }

    pub fn rotation_angle(&self) -> Deg<f32> {
        self.rotation_angle
    }

    pub fn transform(&self) -> &cgmath::Matrix4<f32> {
        &self.transform
    }

    pub fn set_position(&mut self, position: cgmath::Vector3<f32>) {
        self.position = position;
        self.update_transform();
    }

    pub fn set_rotation(&mut self, axis: cgmath::Vector3<f32>, angle: Deg<f32>) {
        self.set_axis(axis);
        self.rotation_angle = angle;
        self.update_transform();
    }

    pub fn set_scale(&mut self, scale: cgmath::Vector3<f32>) {
        self.scale = scale;
        self.update_transform();
    }

    pub fn translate(&mut self, offset: cgmath::Vector3<f32>) {
        self.position += offset;
        self.update_transform();
    }

    /// Replace the rotation axis and add `angle` to the accumulated angle.
    pub fn rotate(&mut self, axis: cgmath::Vector3<f32>, angle: Deg<f32>) {
        self.set_axis(axis);
        self.rotation_angle = self.rotation_angle + angle;
        self.update_transform();
    }

    /// Component-wise multiply the current scale.
    pub fn scale_by(&mut self, factor: cgmath::Vector3<f32>) {
        self.scale = self.scale.mul_element_wise(factor);
        self.update_transform();
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from_axis_angle(self.rotation_axis, self.rotation_angle)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.transform.into(),
        }
    }

    fn update_transform(&mut self) {
        self.transform = self.to_matrix();
    }

    fn set_axis(&mut self, axis: cgmath::Vector3<f32>) {
        // scaled by the largest component first so tiny axes don't underflow
        let finite = axis.x.is_finite() && axis.y.is_finite() && axis.z.is_finite();
        let largest = axis.x.abs().max(axis.y.abs()).max(axis.z.abs());
        if finite && largest > 0.0 {
            let scaled = axis / largest;
            self.rotation_axis = scaled / scaled.magnitude();
        } else {
            log::warn!(
                "Ignoring rotation axis {:?} that can't be normalized, keeping {:?}.",
                axis,
                self.rotation_axis
            );
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        let mut instance = Instance::new();
        instance.set_position(position);
        instance
    }
}

/**
 * The raw instance is the actual data stored on the GPU: one column-major 4x4 model matrix.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4
    ];
}

/**
 * A mat4 takes up 4 vertex slots as it is technically 4 vec4s, so the matrix is declared as
 * four Float32x4 attributes at consecutive locations.
 *
 * The step mode is `Instance`: the shader only advances to the next row when it starts
 * processing the next instance, not the next vertex.
 */
impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
