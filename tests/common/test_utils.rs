#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;

use base64::Engine;
use image::{Rgba, RgbaImage};
use tee_studio::{
    StudioConfig,
    camera::{Camera, Projection},
    compositor::{DesignTexture, UploadedImage},
    data_structures::{instance::Instance, model::ModelVertex},
    resources::{GarmentAsset, MaterialData, MeshData},
    scene::{Renderer, SceneManager, Viewport},
};

pub(crate) const FRONT_PIXEL: Rgba<u8> = Rgba([200, 20, 20, 255]);
pub(crate) const BACK_PIXEL: Rgba<u8> = Rgba([20, 20, 200, 255]);

/// What the recording renderer holds in place of GPU buffers.
#[derive(Debug, Default)]
pub(crate) struct RecordedGarment {
    pub slots: Vec<String>,
    /// Label of the texture currently bound per slot.
    pub bound: HashMap<String, String>,
    /// Every texture bound to the garment, oldest first.
    pub history: Vec<(String, DesignTexture)>,
    pub tint: Option<[f32; 4]>,
}

impl RecordedGarment {
    pub fn bound_label(&self, slot: &str) -> Option<&str> {
        self.bound.get(slot).map(String::as_str)
    }

    pub fn last_texture(&self, slot: &str) -> Option<&DesignTexture> {
        self.history
            .iter()
            .rev()
            .find(|(s, _)| s == slot)
            .map(|(_, t)| t)
    }
}

/// Stands in for the wgpu renderer and remembers every call.
#[derive(Debug)]
pub(crate) struct RecordingRenderer {
    pub viewport: Viewport,
    pub window: Option<(u32, u32)>,
    pub frames: u32,
    pub frames_with_garment: u32,
    pub uploads: u32,
    pub released: u32,
    /// Camera positions of every capture, in the order they were taken.
    pub captures: Vec<[f32; 3]>,
    pub capture_size: (u32, u32),
    pub fail_upload: bool,
    pub fail_capture: bool,
}

impl RecordingRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            window: None,
            frames: 0,
            frames_with_garment: 0,
            uploads: 0,
            released: 0,
            captures: Vec::new(),
            capture_size: (16, 12),
            fail_upload: false,
            fail_capture: false,
        }
    }
}

impl Renderer for RecordingRenderer {
    type Garment = RecordedGarment;

    fn upload(&mut self, asset: GarmentAsset) -> anyhow::Result<RecordedGarment> {
        if self.fail_upload {
            anyhow::bail!("upload refused");
        }
        self.uploads += 1;
        Ok(RecordedGarment {
            slots: asset.slot_names().map(str::to_string).collect(),
            ..Default::default()
        })
    }

    fn resize(&mut self, window: (u32, u32), viewport: Viewport) {
        self.window = Some(window);
        self.viewport = viewport;
    }

    fn render(
        &mut self,
        _camera: &Camera,
        _projection: &Projection,
        garment: Option<&RecordedGarment>,
    ) -> anyhow::Result<()> {
        self.frames += 1;
        if garment.is_some() {
            self.frames_with_garment += 1;
        }
        Ok(())
    }

    fn capture(
        &mut self,
        camera: &Camera,
        _projection: &Projection,
        _garment: Option<&RecordedGarment>,
    ) -> anyhow::Result<RgbaImage> {
        if self.fail_capture {
            anyhow::bail!("readback lost");
        }
        let position: [f32; 3] = camera.position.into();
        self.captures.push(position);
        let pixel = if position[2] >= 0.0 { FRONT_PIXEL } else { BACK_PIXEL };
        let (w, h) = self.capture_size;
        Ok(RgbaImage::from_pixel(w, h, pixel))
    }

    fn bind_texture(&mut self, garment: &mut RecordedGarment, slot: &str, texture: &DesignTexture) -> usize {
        let matched = garment.slots.iter().filter(|s| *s == slot).count();
        if matched > 0 {
            garment.bound.insert(slot.to_string(), texture.label.clone());
            garment.history.push((slot.to_string(), texture.clone()));
        }
        matched
    }

    fn tint(&mut self, garment: &mut RecordedGarment, colour: [f32; 4]) {
        garment.tint = Some(colour);
    }

    fn release(&mut self, _garment: RecordedGarment) {
        self.released += 1;
    }
}

/// Bold sans-serif font shipped with the tests so text draws on hosts
/// without installed fonts.
pub(crate) const TEST_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fonts/Inter-Bold.ttf");

/// Small canvas so text painting stays quick.
pub(crate) fn test_config() -> StudioConfig {
    StudioConfig {
        canvas_size: 128,
        font_size: 16.0,
        font_files: vec![TEST_FONT.into()],
        ..Default::default()
    }
}

pub(crate) fn new_scene() -> SceneManager<RecordingRenderer> {
    new_scene_with(test_config())
}

pub(crate) fn new_scene_with(config: StudioConfig) -> SceneManager<RecordingRenderer> {
    SceneManager::initialize(config, (1280, 800), |_, viewport| Ok(RecordingRenderer::new(viewport)))
        .expect("recording renderer never fails")
}

/// A scene with a garment carrying the given material slots already loaded.
pub(crate) fn loaded_scene(slots: &[&str]) -> SceneManager<RecordingRenderer> {
    let mut scene = new_scene();
    let ticket = scene.begin_model_load().expect("first load of the activation");
    scene.finish_model_load(ticket, Ok(garment_asset(slots)));
    assert!(scene.has_garment());
    scene
}

/// One triangle per slot.
pub(crate) fn garment_asset(slots: &[&str]) -> GarmentAsset {
    let triangle = vec![
        ModelVertex {
            position: [-1.0, -1.0, 0.0],
            tex_coords: [0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [1.0, -1.0, 0.0],
            tex_coords: [1.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [0.0, 1.0, 0.0],
            tex_coords: [0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
    ];
    GarmentAsset {
        meshes: slots
            .iter()
            .enumerate()
            .map(|(material, name)| MeshData {
                name: name.to_lowercase(),
                vertices: triangle.clone(),
                indices: vec![0, 1, 2],
                material,
            })
            .collect(),
        materials: slots
            .iter()
            .map(|name| MaterialData {
                name: name.to_string(),
                base_colour: [1.0; 4],
                image: None,
            })
            .collect(),
        placement: Instance::new(),
    }
}

pub(crate) fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(width, height, pixel)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encoding an in-memory png");
    bytes
}

pub(crate) fn png_upload(name: &str, pixel: Rgba<u8>) -> UploadedImage {
    UploadedImage::new(name, png_bytes(4, 4, pixel))
}

/// A glTF document with one triangle mesh per slot. The buffer is embedded as
/// a data URI and the first node is moved up by one unit.
pub(crate) fn gltf_document(slots: &[&str]) -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]];
    let raw: Vec<u8> = positions
        .iter()
        .flatten()
        .flat_map(|c| c.to_le_bytes())
        .collect();
    let uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&raw)
    );

    let nodes: Vec<_> = (0..slots.len())
        .map(|i| {
            if i == 0 {
                serde_json::json!({ "mesh": i, "translation": [0.0, 1.0, 0.0] })
            } else {
                serde_json::json!({ "mesh": i })
            }
        })
        .collect();
    let meshes: Vec<_> = slots
        .iter()
        .enumerate()
        .map(|(i, name)| {
            serde_json::json!({
                "name": name.to_lowercase(),
                "primitives": [{ "attributes": { "POSITION": 0 }, "material": i }]
            })
        })
        .collect();
    let materials: Vec<_> = slots.iter().map(|name| serde_json::json!({ "name": name })).collect();

    let document = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": (0..slots.len()).collect::<Vec<_>>() }],
        "nodes": nodes,
        "meshes": meshes,
        "materials": materials,
        "buffers": [{ "byteLength": raw.len(), "uri": uri }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": raw.len() }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [-1.0, -1.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    });
    serde_json::to_vec(&document).expect("serializing a json value")
}

/// A fresh directory under the system temp dir, unique per test and process.
pub(crate) fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("tee-studio-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
