//! CPU-side mesh data and its static GPU copy.

use std::collections::HashMap;

use crate::{
    data_structures::vertex::ModelVertex,
    gpu::{BufferRole, GpuBackend},
};

/// Deduplicated vertices plus triangle indices into them.
///
/// Vertices are unique under exact equality and keep the order in which they
/// were first seen. Every index is smaller than [`vertex_count`](Self::vertex_count).
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
    lookup: HashMap<[u32; 8], u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `vertex`, appending it if no identical vertex exists yet.
    pub fn add_vertex(&mut self, vertex: ModelVertex) -> u32 {
        let key = vertex.dedup_key();
        if let Some(&idx) = key.as_ref().and_then(|k| self.lookup.get(k)) {
            return idx;
        }
        let idx = self.vertices.len() as u32;
        self.vertices.push(vertex);
        if let Some(key) = key {
            self.lookup.insert(key, idx);
        }
        idx
    }

    /// Fan-triangulate a convex polygon given as indices returned by [`add_vertex`](Self::add_vertex).
    ///
    /// Polygons with fewer than three corners add nothing.
    pub fn push_polygon(&mut self, corners: &[u32]) {
        debug_assert!(corners.iter().all(|&i| (i as usize) < self.vertices.len()));
        if corners.len() < 3 {
            return;
        }
        for pair in corners[1..].windows(2) {
            self.indices.extend_from_slice(&[corners[0], pair[0], pair[1]]);
        }
    }

    pub fn vertices(&self) -> &[ModelVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The cube that stands in for geometry that couldn't be loaded.
    ///
    /// 8 shared corners of an axis-aligned unit cube centred at the origin and
    /// 12 counter-clockwise triangles.
    pub fn fallback_cube() -> Self {
        let corners = [
            // front
            ModelVertex::new([-0.5, -0.5, 0.5], [0.0, 0.0], [0.0, 0.0, 1.0]),
            ModelVertex::new([0.5, -0.5, 0.5], [1.0, 0.0], [0.0, 0.0, 1.0]),
            ModelVertex::new([0.5, 0.5, 0.5], [1.0, 1.0], [0.0, 0.0, 1.0]),
            ModelVertex::new([-0.5, 0.5, 0.5], [0.0, 1.0], [0.0, 0.0, 1.0]),
            // back
            ModelVertex::new([-0.5, -0.5, -0.5], [1.0, 0.0], [0.0, 0.0, -1.0]),
            ModelVertex::new([0.5, -0.5, -0.5], [0.0, 0.0], [0.0, 0.0, -1.0]),
            ModelVertex::new([0.5, 0.5, -0.5], [0.0, 1.0], [0.0, 0.0, -1.0]),
            ModelVertex::new([-0.5, 0.5, -0.5], [1.0, 1.0], [0.0, 0.0, -1.0]),
        ];
        #[rustfmt::skip]
        let indices: [u32; 36] = [
            0, 1, 2, 0, 2, 3, // front
            4, 6, 5, 4, 7, 6, // back
            0, 4, 5, 0, 5, 1, // bottom
            2, 6, 7, 2, 7, 3, // top
            0, 3, 7, 0, 7, 4, // left
            1, 5, 6, 1, 6, 2, // right
        ];

        let mut mesh = MeshData::new();
        for corner in corners {
            mesh.add_vertex(corner);
        }
        mesh.indices.extend_from_slice(&indices);
        mesh
    }
}

/// Static vertex and index buffers uploaded once per model.
///
/// There is no re-upload path: a model's base geometry is fixed for its lifetime.
pub struct GpuMeshBuffers<G: GpuBackend> {
    pub vertex_buffer: G::Buffer,
    pub index_buffer: G::Buffer,
    pub index_count: u32,
}

impl<G: GpuBackend> GpuMeshBuffers<G> {
    pub fn upload(gpu: &G, label: &str, mesh: &MeshData) -> Self {
        let vertex_buffer = gpu.create_buffer(
            &format!("{label} Vertex Buffer"),
            bytemuck::cast_slice(mesh.vertices()),
            BufferRole::Vertex,
        );
        let index_buffer = gpu.create_buffer(
            &format!("{label} Index Buffer"),
            bytemuck::cast_slice(mesh.indices()),
            BufferRole::Index,
        );
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> ModelVertex {
        ModelVertex::new([x, 0.0, 0.0], [0.0, 0.0], [0.0, 1.0, 0.0])
    }

    #[test]
    fn identical_vertices_are_stored_once() {
        let mut mesh = MeshData::new();
        let a = mesh.add_vertex(vertex(1.0));
        let b = mesh.add_vertex(vertex(2.0));
        let c = mesh.add_vertex(vertex(1.0));
        assert_eq!((a, b, c), (0, 1, 0));
        assert_eq!(mesh.vertex_count(), 2);
    }

    #[test]
    fn nan_vertices_are_never_reused() {
        let mut mesh = MeshData::new();
        let a = mesh.add_vertex(vertex(f32::NAN));
        let b = mesh.add_vertex(vertex(f32::NAN));
        assert_ne!(a, b);
        assert_eq!(mesh.vertex_count(), 2);
    }

    #[test]
    fn polygons_are_fanned_from_the_first_corner() {
        let mut mesh = MeshData::new();
        let corners: Vec<u32> = (0..5).map(|i| mesh.add_vertex(vertex(i as f32))).collect();
        mesh.push_polygon(&corners);
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3, 0, 3, 4]);
    }

    #[test]
    fn degenerate_polygons_add_nothing() {
        let mut mesh = MeshData::new();
        let a = mesh.add_vertex(vertex(0.0));
        let b = mesh.add_vertex(vertex(1.0));
        mesh.push_polygon(&[a, b]);
        assert_eq!(mesh.index_count(), 0);
    }

    #[test]
    fn fallback_cube_shape() {
        let cube = MeshData::fallback_cube();
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.index_count(), 36);
        assert!(cube.indices().iter().all(|&i| i < 8));
        for v in cube.vertices() {
            assert!(v.position.iter().all(|c| c.abs() == 0.5));
        }
        assert_eq!(&cube.indices()[..6], &[0, 1, 2, 0, 2, 3]);
        assert_eq!(&cube.indices()[6..12], &[4, 6, 5, 4, 7, 6]);
    }
}
