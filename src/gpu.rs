//! The seam between the model core and the graphics API.
//!
//! Everything a [`Model`](crate::data_structures::model::Model) needs from the
//! GPU is expressed by [`GpuBackend`]: create buffers, rewrite the dynamic
//! instance buffer, create a texture and record an instanced draw. The wgpu
//! implementation lives on [`Context`](crate::context::Context).

/// What a buffer is used for. Static roles are never rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferRole {
    Vertex,
    Index,
    /// Per-instance vertex data that is rewritten whenever the instance set changes.
    Instance,
}

impl BufferRole {
    pub fn usages(self) -> wgpu::BufferUsages {
        match self {
            BufferRole::Vertex => wgpu::BufferUsages::VERTEX,
            BufferRole::Index => wgpu::BufferUsages::INDEX,
            BufferRole::Instance => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        }
    }
}

/// Everything needed to issue one indexed, instanced draw of a mesh.
pub struct InstancedDraw<'a, G: GpuBackend + ?Sized> {
    pub vertices: &'a G::Buffer,
    pub indices: &'a G::Buffer,
    pub instances: &'a G::Buffer,
    /// `None` draws with the backend's default texture.
    pub texture: Option<&'a G::Texture>,
    pub index_count: u32,
    pub instance_count: u32,
}

pub trait GpuBackend {
    type Buffer;
    type Texture;
    type Pass<'pass>;

    fn create_buffer(&self, label: &str, contents: &[u8], role: BufferRole) -> Self::Buffer;

    /// Replace the contents of a dynamic buffer, reallocating it when `contents`
    /// doesn't fit into the current allocation.
    fn write_buffer(&self, buffer: &mut Self::Buffer, label: &str, contents: &[u8]);

    fn create_texture(&self, label: &str, image: &image::RgbaImage) -> Self::Texture;

    fn draw_instanced(&self, pass: &mut Self::Pass<'_>, draw: InstancedDraw<'_, Self>);
}
