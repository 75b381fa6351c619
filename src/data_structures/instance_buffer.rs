//! The per-instance transform buffer that feeds instanced draws.

use crate::{
    data_structures::{instance::InstanceRaw, instance_set::InstanceSet},
    gpu::{BufferRole, GpuBackend},
};

/**
 * One model matrix per live instance, in the instance set's insertion order.
 *
 * The buffer is a cache of the instance set: it is only rebuilt when the set
 * reports itself dirty, and always as a whole. The GPU allocation is created
 * lazily by the first rebuild and rewritten in place afterwards.
 */
pub struct InstanceTransformBuffer<G: GpuBackend> {
    label: String,
    rows: Vec<InstanceRaw>,
    buffer: Option<G::Buffer>,
    rebuilds: u64,
}

impl<G: GpuBackend> InstanceTransformBuffer<G> {
    pub fn new(label: &str) -> Self {
        Self {
            label: format!("{label} Instance Buffer"),
            rows: Vec::new(),
            buffer: None,
            rebuilds: 0,
        }
    }

    /// Rebuild from `instances` if they changed since the last rebuild.
    ///
    /// Returns whether a rebuild happened. The dirty flag of `instances` is
    /// cleared afterwards.
    pub fn ensure_current(&mut self, gpu: &G, instances: &mut InstanceSet) -> bool {
        if !instances.is_dirty() && self.buffer.is_some() {
            return false;
        }
        self.rows.clear();
        self.rows
            .extend(instances.iter().map(|(_, instance)| instance.to_raw()));

        let contents: &[u8] = bytemuck::cast_slice(&self.rows);
        match self.buffer.as_mut() {
            Some(buffer) => gpu.write_buffer(buffer, &self.label, contents),
            None => {
                self.buffer = Some(gpu.create_buffer(&self.label, contents, BufferRole::Instance));
            }
        }
        self.rebuilds += 1;
        instances.mark_clean();
        log::debug!("Rebuilt {} with {} rows.", self.label, self.rows.len());
        true
    }

    pub fn buffer(&self) -> Option<&G::Buffer> {
        self.buffer.as_ref()
    }

    /// The matrices as of the last rebuild.
    pub fn rows(&self) -> &[InstanceRaw] {
        &self.rows
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}
