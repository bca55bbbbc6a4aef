//! Render pipelines.

pub mod garment;
pub mod light;
