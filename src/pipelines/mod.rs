//! Render pipelines.
//!
//! - `basic` is the lit, textured, instanced pipeline used for every model

pub mod basic;
