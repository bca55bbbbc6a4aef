use wgpu::util::DeviceExt;

use crate::config::LightConfig;

/// Ambient plus one directional light, pre-multiplied by their intensities.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    ambient: [f32; 4],
    // Direction towards the light; w unused.
    direction: [f32; 4],
    colour: [f32; 4],
}

impl LightUniform {
    pub fn from_config(config: &LightConfig) -> Self {
        let [ar, ag, ab] = config.ambient_colour;
        let [dr, dg, db] = config.directional_colour;
        let [x, y, z] = config.directional_position;
        let len = (x * x + y * y + z * z).sqrt().max(f32::EPSILON);
        let a = config.ambient_intensity;
        let d = config.directional_intensity;
        Self {
            ambient: [ar * a, ag * a, ab * a, 1.0],
            direction: [x / len, y / len, z / len, 0.0],
            colour: [dr * d, dg * d, db * d, 1.0],
        }
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, config: &LightConfig) -> Self {
        let uniform = LightUniform::from_config(config);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("light_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}
