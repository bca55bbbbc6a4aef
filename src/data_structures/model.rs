//! GPU-side garment model: meshes, material slots and draw helpers.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Per-material uniform: the garment tint multiplied with the base colour factor.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub colour: [f32; 4],
}

/// A named material slot. Design textures replace `texture` wholesale.
#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub texture: Texture,
    pub base_colour: [f32; 4],
    pub tint: [f32; 4],
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        texture: Texture,
        base_colour: [f32; 4],
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let tint = [1.0; 4];
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} material uniform")),
            contents: bytemuck::cast_slice(&[Self::uniform(base_colour, tint)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = Self::mk_bind_group(device, name, &texture, &uniform_buffer, layout);
        Self {
            name: name.to_string(),
            texture,
            base_colour,
            tint,
            uniform_buffer,
            bind_group,
        }
    }

    fn uniform(base_colour: [f32; 4], tint: [f32; 4]) -> MaterialUniform {
        let mut colour = [0.0; 4];
        for (c, (b, t)) in colour.iter_mut().zip(base_colour.iter().zip(tint.iter())) {
            *c = b * t;
        }
        MaterialUniform { colour }
    }

    fn mk_bind_group(
        device: &wgpu::Device,
        name: &str,
        texture: &Texture,
        uniform_buffer: &wgpu::Buffer,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
            label: Some(name),
        })
    }

    /// Binds a new texture and returns the one it replaces.
    pub fn replace_texture(
        &mut self,
        device: &wgpu::Device,
        texture: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Texture {
        self.bind_group = Self::mk_bind_group(device, &self.name, &texture, &self.uniform_buffer, layout);
        std::mem::replace(&mut self.texture, texture)
    }

    pub fn set_tint(&mut self, queue: &wgpu::Queue, tint: [f32; 4]) {
        self.tint = tint;
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[Self::uniform(self.base_colour, tint)]),
        );
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    /// Indices of all materials whose name equals `slot` exactly.
    pub fn slots<'a>(&'a self, slot: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.materials
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.name == slot)
            .map(|(i, _)| i)
    }
}

pub trait DrawModel<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );

    fn draw_model_instanced(
        &mut self,
        model: &'a Model,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model_instanced(
        &mut self,
        model: &'b Model,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            if let Some(material) = model.materials.get(mesh.material) {
                self.draw_mesh_instanced(
                    mesh,
                    material,
                    instances.clone(),
                    camera_bind_group,
                    light_bind_group,
                );
            }
        }
    }
}
