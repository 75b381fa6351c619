//! Engine data structures: meshes, instances, textures and models.
//!
//! - `vertex` is the per-vertex record and the vertex layout trait
//! - `mesh` holds deduplicated mesh data and its static GPU buffers
//! - `instance` holds per-instance transformation data
//! - `instance_set` tracks the live instances of one model and whether they changed
//! - `instance_buffer` is the per-instance transform buffer rebuilt from an instance set
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `model` ties a mesh, its instances and its texture together

pub mod instance;
pub mod instance_buffer;
pub mod instance_set;
pub mod mesh;
pub mod model;
pub mod texture;
pub mod vertex;
