//! Per-vertex data as it is stored on the GPU.

use std::mem;

/**
 * Anything that is stored in a vertex buffer has to tell wgpu what its bytes refer to.
 */
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// One mesh vertex: position, texture coordinate and normal.
///
/// Equality is exact, field-wise float equality. Two vertices that differ in
/// the last bit of any component are different vertices.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl ModelVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3
    ];

    pub fn new(position: [f32; 3], tex_coords: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            tex_coords,
            normal,
        }
    }

    /// Hash key that agrees with `==`: `-0.0` and `0.0` map to the same bits and
    /// vertices containing NaN have no key because they never compare equal.
    pub(crate) fn dedup_key(&self) -> Option<[u32; 8]> {
        let mut key = [0u32; 8];
        let components = self
            .position
            .iter()
            .chain(self.tex_coords.iter())
            .chain(self.normal.iter());
        for (slot, &c) in key.iter_mut().zip(components) {
            if c.is_nan() {
                return None;
            }
            *slot = if c == 0.0 { 0 } else { c.to_bits() };
        }
        Some(key)
    }
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_record() {
        let desc = ModelVertex::desc();
        assert_eq!(desc.array_stride, 32);
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Vertex);
        let slots: Vec<_> = desc
            .attributes
            .iter()
            .map(|a| (a.shader_location, a.offset, a.format))
            .collect();
        assert_eq!(
            slots,
            vec![
                (0, 0, wgpu::VertexFormat::Float32x3),
                (1, 12, wgpu::VertexFormat::Float32x2),
                (2, 20, wgpu::VertexFormat::Float32x3),
            ]
        );
    }

    #[test]
    fn signed_zero_shares_a_key() {
        let a = ModelVertex::new([0.0, 1.0, 2.0], [0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = ModelVertex::new([-0.0, 1.0, 2.0], [0.0, -0.0], [0.0, 1.0, 0.0]);
        assert_eq!(a, b);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn nan_has_no_key() {
        let v = ModelVertex::new([f32::NAN, 0.0, 0.0], [0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(v.dedup_key(), None);
    }
}
