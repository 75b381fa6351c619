//! A mesh together with every placed copy of it.
//!
//! [`Model`] is what scene code works with: load it once, create instances,
//! move them around and call [`Model::draw_all`] once per frame. All instances
//! are drawn by a single instanced draw call.

use std::path::Path;

use crate::{
    context::Context,
    data_structures::{
        instance::{Instance, InstanceRaw},
        instance_buffer::InstanceTransformBuffer,
        instance_set::{InstanceId, InstanceMut, InstanceSet},
        mesh::{GpuMeshBuffers, MeshData},
    },
    error::LoadError,
    gpu::{GpuBackend, InstancedDraw},
    resources,
};

/**
 * A Model owns its mesh, the static GPU copy of that mesh, its instances, the
 * per-instance transform buffer and at most one texture.
 *
 * Fields drop in declaration order: instances go first, the buffers that
 * depend on the mesh go before the mesh itself.
 */
pub struct Model<G: GpuBackend = Context> {
    label: String,
    instances: InstanceSet,
    transforms: InstanceTransformBuffer<G>,
    texture: Option<G::Texture>,
    buffers: GpuMeshBuffers<G>,
    mesh: MeshData,
}

impl<G: GpuBackend> Model<G> {
    /// Load geometry from a face-indexed mesh file.
    ///
    /// This never fails: a source that can't be used is replaced by the
    /// fallback cube and the reason is logged.
    pub fn load(gpu: &G, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let label = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        Self::from_mesh(gpu, &label, resources::load_mesh(path))
    }

    /// Upload `mesh` and wrap it into a model without instances.
    pub fn from_mesh(gpu: &G, label: &str, mesh: MeshData) -> Self {
        let buffers = GpuMeshBuffers::upload(gpu, label, &mesh);
        Self {
            label: label.to_string(),
            instances: InstanceSet::new(),
            transforms: InstanceTransformBuffer::new(label),
            texture: None,
            buffers,
            mesh,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn buffers(&self) -> &GpuMeshBuffers<G> {
        &self.buffers
    }

    pub fn create_instance(&mut self) -> InstanceId {
        self.instances.create()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    /// Mutable access to one instance. Returns `None` for destroyed instances.
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<InstanceMut<'_>> {
        self.instances.get_mut(id)
    }

    /// Remove an instance. Returns `false` if it had already been destroyed.
    pub fn destroy_instance(&mut self, id: InstanceId) -> bool {
        self.instances.destroy(id).is_some()
    }

    /// Live instances in creation order.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &Instance)> + '_ {
        self.instances.iter()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /**
     * Decode an image and use it as this model's texture.
     *
     * A model holds at most one texture. Later calls are rejected with
     * [`LoadError::DuplicateTextureAssignment`] and leave the first texture in place.
     * Any failure leaves the model as it was; it keeps drawing with the default texture.
     */
    pub fn load_texture(&mut self, gpu: &G, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        if self.texture.is_some() {
            log::error!(
                "Model {} already has a texture, ignoring {}.",
                self.label,
                path.display()
            );
            return Err(LoadError::DuplicateTextureAssignment);
        }
        let image = resources::texture::decode_texture(path).inspect_err(|err| {
            log::error!("Texture for model {} wasn't loaded: {}", self.label, err);
        })?;
        log::info!(
            "Loaded texture {} ({}x{}) for model {}.",
            path.display(),
            image.width(),
            image.height(),
            self.label
        );
        self.texture = Some(gpu.create_texture(&format!("{} Texture", self.label), &image));
        Ok(())
    }

    pub fn texture(&self) -> Option<&G::Texture> {
        self.texture.as_ref()
    }

    /**
     * Draw every live instance with one instanced draw call.
     *
     * The transform buffer is rebuilt first if any instance changed since the
     * last draw. Nothing is recorded when there are no instances.
     */
    pub fn draw_all(&mut self, gpu: &G, pass: &mut G::Pass<'_>) {
        if self.instances.is_empty() {
            return;
        }
        self.transforms.ensure_current(gpu, &mut self.instances);
        let Some(instances) = self.transforms.buffer() else {
            return;
        };
        gpu.draw_instanced(
            pass,
            InstancedDraw {
                vertices: &self.buffers.vertex_buffer,
                indices: &self.buffers.index_buffer,
                instances,
                texture: self.texture.as_ref(),
                index_count: self.buffers.index_count,
                instance_count: self.instances.len() as u32,
            },
        );
    }

    /// Whether the next [`draw_all`](Self::draw_all) has to rebuild the transform buffer.
    pub fn needs_rebuild(&self) -> bool {
        self.instances.is_dirty()
    }

    /// The transform rows as of the last rebuild.
    pub fn transform_rows(&self) -> &[InstanceRaw] {
        self.transforms.rows()
    }

    pub fn rebuild_count(&self) -> u64 {
        self.transforms.rebuild_count()
    }
}

impl<G: GpuBackend> Drop for Model<G> {
    fn drop(&mut self) {
        log::debug!(
            "Dropping model {} with {} live instances.",
            self.label,
            self.instances.len()
        );
        self.instances.clear();
    }
}
