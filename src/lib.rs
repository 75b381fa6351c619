//! flow-instancing
//!
//! Face-indexed mesh loading and per-model instanced rendering on top of wgpu.
//! A [`Model`] owns one mesh and any number of independently transformed
//! instances of it, and draws all of them with a single instanced draw call.
//! The per-instance transform buffer is rebuilt lazily, only after instances
//! were created, moved or destroyed.
//!
//! High-level modules
//! - `camera`: look-at camera with a wgpu-corrected perspective projection
//! - `config`: runtime settings (asset root, clear colour, light, tick rate)
//! - `context`: the wgpu device/queue and the GPU backend models draw with
//! - `data_structures`: meshes, instances, instance buffers, textures and models
//! - `error`: error kinds reported while loading meshes and textures
//! - `flow`: the event loop and the scene trait it drives
//! - `gpu`: the trait separating models from the graphics API
//! - `pipelines`: the instanced render pipeline and its shader program
//! - `resources`: mesh and texture file loading
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod gpu;
pub mod pipelines;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::{Deg, Point3, Vector3};
pub use data_structures::{
    instance::Instance,
    instance_set::InstanceId,
    mesh::MeshData,
    model::Model,
};
pub use error::LoadError;
pub use winit::event::WindowEvent;
