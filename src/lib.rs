//! tee-studio
//!
//! An interactive 3D garment customizer. A t-shirt mesh with named material
//! slots is loaded into a wgpu scene, text and uploaded images are painted onto
//! its front and back, and both sides are captured as PNGs for the order flow.
//!
//! High-level modules
//! - `scene`: the customization view, its lifecycle and the `Renderer` seam
//! - `camera`: camera, projection and the damped orbit controls
//! - `compositor`: text canvases and uploaded image decoding
//! - `capture`: captured front/back artifacts
//! - `design`: per-side design state and panel inputs
//! - `order`: hand-off to order persistence
//! - `render`, `context`, `pipelines`, `data_structures`: the wgpu renderer
//! - `resources`: garment asset loading
//! - `flow`: the windowed event loop
//!

pub mod camera;
pub mod capture;
pub mod compositor;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod design;
pub mod error;
pub mod flow;
pub mod order;
pub mod panel;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::StudioConfig;
pub use design::{DesignState, Font, Placement, Side, TextRequest};
pub use error::{Result, StudioError};
pub use flow::run;
pub use scene::{Renderer, SceneManager};
