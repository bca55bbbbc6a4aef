//! Studio configuration.
//!
//! Every constant of the customization view lives in [`StudioConfig`]. The
//! defaults reproduce the storefront's view; a JSON file can override any
//! subset of the fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A fixed camera placement used by the capture pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub ambient_colour: [f32; 3],
    pub ambient_intensity: f32,
    pub directional_colour: [f32; 3],
    pub directional_intensity: f32,
    /// The directional light shines from this point towards the origin.
    pub directional_position: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            ambient_colour: [1.0, 1.0, 1.0],
            ambient_intensity: 2.0,
            directional_colour: [1.0, 1.0, 1.0],
            directional_intensity: 2.0,
            directional_position: [5.0, 10.0, 5.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Directory the garment asset is resolved against.
    pub asset_root: PathBuf,
    /// GLB file loaded once per activation.
    pub model_path: String,
    pub model_scale: f32,
    pub model_offset: [f32; 3],

    /// Width reserved for the side panel in logical pixels; the render
    /// surface gets the rest.
    pub side_panel_width: u32,
    pub clear_colour: [f64; 4],

    pub camera_position: [f32; 3],
    pub orbit_target: [f32; 3],
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,

    pub damping_factor: f32,
    /// Lower and upper bound of the polar angle in degrees, measured from +Y.
    pub polar_band_degrees: [f32; 2],
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    pub lights: LightConfig,

    /// Edge length of the square canvas text is painted on.
    pub canvas_size: u32,
    pub font_size: f32,
    /// Font files loaded next to the system fonts before text is painted.
    pub font_files: Vec<PathBuf>,

    pub front_view: Viewpoint,
    pub back_view: Viewpoint,
    /// Where captures and outgoing orders are written by the demo.
    pub output_dir: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            model_path: "Tshirt_02_N.glb".to_string(),
            model_scale: 0.9,
            model_offset: [0.0, -12.0, 0.0],
            side_panel_width: 320,
            // #eeeeee
            clear_colour: [0.933, 0.933, 0.933, 1.0],
            camera_position: [0.0, 8.0, 25.0],
            orbit_target: [0.0, 0.0, 0.0],
            fovy_degrees: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            damping_factor: 0.25,
            polar_band_degrees: [45.0, 72.0],
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 10.0,
            max_distance: 60.0,
            lights: LightConfig::default(),
            canvas_size: 800,
            font_size: 100.0,
            font_files: Vec::new(),
            front_view: Viewpoint {
                position: [0.0, 0.0, 25.0],
                look_at: [0.0, 0.0, 20.0],
            },
            back_view: Viewpoint {
                position: [0.0, -3.0, -25.0],
                look_at: [0.0, 0.0, 20.0],
            },
            output_dir: PathBuf::from("out"),
        }
    }
}

impl StudioConfig {
    /// Reads a JSON config, falling back to the defaults when the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full path of the garment asset on native targets.
    pub fn model_file(&self) -> PathBuf {
        self.asset_root.join(&self.model_path)
    }

    /// Side panel width in physical pixels for a window with `scale_factor`.
    pub fn side_panel_px(&self, scale_factor: f64) -> u32 {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return self.side_panel_width;
        }
        (self.side_panel_width as f64 * scale_factor).round() as u32
    }

    pub fn clear_colour(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_colour;
        wgpu::Color { r, g, b, a }
    }
}
