//! The live instances of one model.
//!
//! Instances are addressed by [`InstanceId`], a generational handle. A handle
//! outlives the instance it names: once the instance is destroyed, lookups
//! through it return `None` and destroying it again does nothing.

use std::ops::Deref;

use cgmath::Deg;
use slotmap::{SlotMap, new_key_type};

use crate::data_structures::instance::Instance;

new_key_type! {
    /// Handle to one instance of a model.
    pub struct InstanceId;
}

/// Insertion-ordered instances plus a dirty flag for the derived instance buffer.
///
/// Any change to membership or to an instance's transform sets the flag; the
/// owner of the derived buffer clears it after rebuilding.
#[derive(Debug, Default)]
pub struct InstanceSet {
    instances: SlotMap<InstanceId, Instance>,
    order: Vec<InstanceId>,
    dirty: bool,
}

impl InstanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an identity instance to the back of the set.
    pub fn create(&mut self) -> InstanceId {
        let id = self.instances.insert(Instance::new());
        self.order.push(id);
        self.dirty = true;
        id
    }

    /// Remove the instance named by `id`. Returns `None` if it was already gone.
    pub fn destroy(&mut self, id: InstanceId) -> Option<Instance> {
        let instance = self.instances.remove(id)?;
        if let Some(pos) = self.order.iter().position(|&other| other == id) {
            self.order.remove(pos);
        }
        self.dirty = true;
        Some(instance)
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    /// Borrow an instance for mutation; every mutation through the guard marks the set dirty.
    pub fn get_mut(&mut self, id: InstanceId) -> Option<InstanceMut<'_>> {
        let instance = self.instances.get_mut(id)?;
        Some(InstanceMut {
            instance,
            dirty: &mut self.dirty,
        })
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    /// Instances in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &Instance)> + '_ {
        self.order.iter().map(|&id| (id, &self.instances[id]))
    }

    pub fn ids(&self) -> &[InstanceId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Destroy every instance.
    pub fn clear(&mut self) {
        if !self.order.is_empty() {
            self.dirty = true;
        }
        self.order.clear();
        self.instances.clear();
    }
}

/// Mutable access to one instance that reports every change to its set.
pub struct InstanceMut<'a> {
    instance: &'a mut Instance,
    dirty: &'a mut bool,
}

impl<'a> InstanceMut<'a> {
    pub fn set_position(&mut self, position: cgmath::Vector3<f32>) -> &mut Self {
        self.instance.set_position(position);
        *self.dirty = true;
        self
    }

    pub fn set_rotation(&mut self, axis: cgmath::Vector3<f32>, angle: Deg<f32>) -> &mut Self {
        self.instance.set_rotation(axis, angle);
        *self.dirty = true;
        self
    }

    pub fn set_scale(&mut self, scale: cgmath::Vector3<f32>) -> &mut Self {
        self.instance.set_scale(scale);
        *self.dirty = true;
        self
    }

    pub fn translate(&mut self, offset: cgmath::Vector3<f32>) -> &mut Self {
        self.instance.translate(offset);
        *self.dirty = true;
        self
    }

    pub fn rotate(&mut self, axis: cgmath::Vector3<f32>, angle: Deg<f32>) -> &mut Self {
        self.instance.rotate(axis, angle);
        *self.dirty = true;
        self
    }

    pub fn scale_by(&mut self, factor: cgmath::Vector3<f32>) -> &mut Self {
        self.instance.scale_by(factor);
        *self.dirty = true;
        self
    }
}

impl Deref for InstanceMut<'_> {
    type Target = Instance;

    fn deref(&self) -> &Instance {
        self.instance
    }
}
