//! GPU data structures for the garment stage.
//!
//! - `model` holds meshes, named material slots and draw helpers
//! - `texture` wraps GPU textures and their creation
//! - `instance` places the garment in the scene

pub mod instance;
pub mod model;
pub mod texture;
