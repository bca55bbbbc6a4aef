//! Loading of the garment asset.
//!
//! Everything in here runs on the CPU and produces a [`GarmentAsset`] that is
//! `Send`, so the load can happen on a worker task while the render loop keeps
//! going. Uploading to the GPU happens later in [`crate::render`].

use std::collections::HashMap;

use base64::Engine;
use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix, Transform};
use image::RgbaImage;

use crate::config::StudioConfig;
use crate::data_structures::instance::Instance;
use crate::data_structures::model::ModelVertex;

pub mod texture;

pub use texture::load_binary;

#[derive(Clone, Debug)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: usize,
}

#[derive(Clone, Debug)]
pub struct MaterialData {
    pub name: String,
    pub base_colour: [f32; 4],
    pub image: Option<RgbaImage>,
}

/// A parsed garment mesh with its named material slots.
#[derive(Clone, Debug)]
pub struct GarmentAsset {
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
    pub placement: Instance,
}

impl GarmentAsset {
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.materials.iter().map(|m| m.name.as_str())
    }

    /// Parses a glTF or GLB document whose buffers and images are all embedded.
    pub fn from_slice(bytes: &[u8], placement: Instance) -> anyhow::Result<Self> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        Self::from_gltf(&gltf, &HashMap::new(), placement)
    }

    /// Builds the asset from a parsed document. `external` maps relative URIs
    /// to their already fetched contents.
    pub fn from_gltf(
        gltf: &gltf::Gltf,
        external: &HashMap<String, Vec<u8>>,
        placement: Instance,
    ) -> anyhow::Result<Self> {
        let mut buffers = Vec::new();
        for buffer in gltf.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => gltf
                    .blob
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("GLB has no binary chunk"))?,
                gltf::buffer::Source::Uri(uri) => resolve_uri(uri, external)?,
            };
            buffers.push(data);
        }

        let mut materials = Vec::new();
        for material in gltf.materials() {
            let pbr = material.pbr_metallic_roughness();
            let image = match pbr.base_color_texture() {
                Some(info) => decode_material_image(info.texture().source(), &buffers, external)?,
                None => None,
            };
            materials.push(MaterialData {
                name: material.name().unwrap_or_default().to_string(),
                base_colour: pbr.base_color_factor(),
                image,
            });
        }

        let mut meshes = Vec::new();
        let mut default_material = None;
        let scenes: Vec<_> = match gltf.default_scene() {
            Some(scene) => vec![scene],
            None => gltf.scenes().collect(),
        };
        for scene in scenes {
            for node in scene.nodes() {
                collect_meshes(
                    &node,
                    Matrix4::identity(),
                    &buffers,
                    &mut materials,
                    &mut default_material,
                    &mut meshes,
                );
            }
        }
        if meshes.is_empty() {
            anyhow::bail!("asset contains no drawable meshes");
        }

        Ok(Self {
            meshes,
            materials,
            placement,
        })
    }
}

fn resolve_uri(uri: &str, external: &HashMap<String, Vec<u8>>) -> anyhow::Result<Vec<u8>> {
    if let Some(rest) = uri.strip_prefix("data:") {
        let (_, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| anyhow::anyhow!("unsupported data URI"))?;
        return Ok(base64::engine::general_purpose::STANDARD.decode(payload)?);
    }
    external
        .get(uri)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("external resource {uri} was not fetched"))
}

fn decode_material_image(
    image: gltf::Image,
    buffers: &[Vec<u8>],
    external: &HashMap<String, Vec<u8>>,
) -> anyhow::Result<Option<RgbaImage>> {
    let bytes = match image.source() {
        gltf::image::Source::View { view, .. } => {
            let buffer = buffers
                .get(view.buffer().index())
                .ok_or_else(|| anyhow::anyhow!("image view points past the buffers"))?;
            let start = view.offset();
            let end = start + view.length();
            buffer
                .get(start..end)
                .ok_or_else(|| anyhow::anyhow!("image view out of range"))?
                .to_vec()
        }
        gltf::image::Source::Uri { uri, .. } => resolve_uri(uri, external)?,
    };
    match image::load_from_memory(&bytes) {
        Ok(img) => Ok(Some(img.to_rgba8())),
        Err(e) => {
            log::warn!("skipping undecodable material image {}: {e}", image.index());
            Ok(None)
        }
    }
}

fn collect_meshes(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[Vec<u8>],
    materials: &mut Vec<MaterialData>,
    default_material: &mut Option<usize>,
    meshes: &mut Vec<MeshData>,
) {
    let world = parent * Matrix4::from(node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let normal_matrix = world
            .invert()
            .map(|inv| {
                let t = inv.transpose();
                Matrix3::from_cols(t.x.truncate(), t.y.truncate(), t.z.truncate())
            })
            .unwrap_or_else(Matrix3::identity);

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|b| buffers.get(b.index()).map(Vec::as_slice));
            let Some(positions) = reader.read_positions() else {
                log::warn!("primitive {} of {:?} has no positions", primitive.index(), mesh.name());
                continue;
            };
            let mut vertices: Vec<ModelVertex> = positions
                .map(|p| ModelVertex {
                    position: world.transform_point(p.into()).into(),
                    ..Default::default()
                })
                .collect();
            if let Some(normals) = reader.read_normals() {
                for (v, n) in vertices.iter_mut().zip(normals) {
                    let n = normal_matrix * cgmath::Vector3::from(n);
                    v.normal = n.into();
                }
            }
            if let Some(uvs) = reader.read_tex_coords(0).map(|t| t.into_f32()) {
                for (v, uv) in vertices.iter_mut().zip(uvs) {
                    v.tex_coords = uv;
                }
            }
            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };

            let material = match primitive.material().index() {
                Some(idx) => idx,
                None => *default_material.get_or_insert_with(|| {
                    materials.push(MaterialData {
                        name: String::new(),
                        base_colour: [1.0; 4],
                        image: None,
                    });
                    materials.len() - 1
                }),
            };

            meshes.push(MeshData {
                name: mesh.name().unwrap_or("mesh").to_string(),
                vertices,
                indices,
                material,
            });
        }
    }
    for child in node.children() {
        collect_meshes(&child, world, buffers, materials, default_material, meshes);
    }
}

fn external_uris(gltf: &gltf::Gltf) -> Vec<String> {
    let buffers = gltf.buffers().filter_map(|b| match b.source() {
        gltf::buffer::Source::Uri(uri) => Some(uri.to_string()),
        gltf::buffer::Source::Bin => None,
    });
    let images = gltf.images().filter_map(|i| match i.source() {
        gltf::image::Source::Uri { uri, .. } => Some(uri.to_string()),
        gltf::image::Source::View { .. } => None,
    });
    buffers
        .chain(images)
        .filter(|uri| !uri.starts_with("data:"))
        .collect()
}

/// Fetches and parses the configured garment, staged at the configured
/// offset and scale.
pub async fn load_garment_asset(config: &StudioConfig) -> anyhow::Result<GarmentAsset> {
    let bytes = load_binary(&config.asset_root, &config.model_path).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;
    let mut external = HashMap::new();
    for uri in external_uris(&gltf) {
        let data = load_binary(&config.asset_root, &uri).await?;
        external.insert(uri, data);
    }
    let asset = GarmentAsset::from_gltf(
        &gltf,
        &external,
        Instance::staged(config.model_offset, config.model_scale),
    )?;
    log::info!(
        "loaded {} with {} meshes, slots {:?}",
        config.model_path,
        asset.meshes.len(),
        asset.slot_names().collect::<Vec<_>>()
    );
    Ok(asset)
}
