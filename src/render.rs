//! The wgpu implementation of [`Renderer`].
//!
//! The stage is drawn into the part of the surface right of the side panel.
//! Captures render the same viewport into an offscreen target of the
//! viewport's size and read it back through a mapped buffer.

use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::camera::{Camera, CameraResources, Projection};
use crate::capture::{padded_bytes_per_row, unpad_rows};
use crate::compositor::{DesignTexture, Wrap, fit_image};
use crate::config::StudioConfig;
use crate::context::Context;
use crate::data_structures::instance::Instance;
use crate::data_structures::model::{DrawModel, Material, Mesh, Model};
use crate::data_structures::texture::Texture;
use crate::pipelines::{garment::mk_garment_pipeline, light::LightResources};
use crate::resources::{GarmentAsset, texture::material_layout};
use crate::scene::{Renderer, Viewport};

/// A garment uploaded to the GPU.
#[derive(Debug)]
pub struct GpuGarment {
    pub model: Model,
    pub instance: Instance,
    instance_buffer: wgpu::Buffer,
}

pub struct GpuRenderer {
    pub ctx: Context,
    viewport: Viewport,
    depth_texture: Texture,
    camera: CameraResources,
    light: LightResources,
    material_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    // Headless contexts present into this instead of a surface.
    offscreen: Option<Texture>,
}

impl GpuRenderer {
    pub fn new(ctx: Context, config: &StudioConfig, viewport: Viewport) -> Self {
        let device = &ctx.device;
        let camera = CameraResources::new(device);
        let light = LightResources::new(device, &config.lights);
        let material_layout = material_layout(device);
        let pipeline = mk_garment_pipeline(
            device,
            ctx.config.format,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );
        let size = [ctx.config.width, ctx.config.height];
        let depth_texture = Texture::create_depth_texture(device, size, "depth_texture");
        let offscreen = ctx
            .surface
            .is_none()
            .then(|| Texture::create_render_target(device, size, ctx.config.format, "offscreen"));

        Self {
            ctx,
            viewport,
            depth_texture,
            camera,
            light,
            material_layout,
            pipeline,
            offscreen,
        }
    }

    /// Clears `target` and draws the garment into `rect` (x, y, width, height).
    /// The camera uniform must already be written.
    fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        rect: (u32, u32, u32, u32),
        garment: Option<&GpuGarment>,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Garment Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        let Some(garment) = garment else {
            return;
        };
        let (x, y, w, h) = rect;
        render_pass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(1, garment.instance_buffer.slice(..));
        render_pass.draw_model_instanced(
            &garment.model,
            0..1,
            &self.camera.bind_group,
            &self.light.bind_group,
        );
    }

    fn stage_rect(&self) -> (u32, u32, u32, u32) {
        let width = self.ctx.config.width;
        let x = self.viewport.x.min(width.saturating_sub(1));
        let w = self.viewport.width.min(width - x).max(1);
        let h = self.viewport.height.min(self.ctx.config.height).max(1);
        (x, 0, w, h)
    }

    /// Copies a colour target into an RGBA image.
    pub fn read_back(&self, texture: &wgpu::Texture, width: u32, height: u32) -> anyhow::Result<RgbaImage> {
        let padded_row = padded_bytes_per_row(width);
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Buffer"),
            size: (padded_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Copy Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);
        futures::executor::block_on(rx.receive())
            .ok_or_else(|| anyhow::anyhow!("readback channel closed"))??;

        let bgra = matches!(
            texture.format(),
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        let pixels = unpad_rows(&slice.get_mapped_range(), width, height, padded_row, bgra);
        buffer.unmap();
        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow::anyhow!("readback size mismatch"))
    }

    /// Reads back what the last headless frame drew.
    pub fn read_offscreen(&self) -> anyhow::Result<RgbaImage> {
        let target = self
            .offscreen
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("windowed renderers have no offscreen frame"))?;
        self.read_back(&target.texture, self.ctx.config.width, self.ctx.config.height)
    }
}

impl Renderer for GpuRenderer {
    type Garment = GpuGarment;

    fn upload(&mut self, asset: GarmentAsset) -> anyhow::Result<GpuGarment> {
        let max_dimension = self.max_texture_dimension();
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        let mut materials = Vec::with_capacity(asset.materials.len());
        for data in asset.materials {
            let texture = match data.image {
                Some(image) => Texture::from_rgba(
                    device,
                    queue,
                    &fit_image(image, max_dimension, &data.name),
                    &data.name,
                    Wrap::Repeat,
                    Wrap::Repeat,
                ),
                None => Texture::create_white(device, queue),
            };
            materials.push(Material::new(
                device,
                &data.name,
                texture,
                data.base_colour,
                &self.material_layout,
            ));
        }

        let mut meshes = Vec::with_capacity(asset.meshes.len());
        for data in &asset.meshes {
            if data.material >= materials.len() {
                anyhow::bail!("mesh {} references missing material {}", data.name, data.material);
            }
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", data.name)),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", data.name)),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            meshes.push(Mesh {
                name: data.name.clone(),
                vertex_buffer,
                index_buffer,
                num_elements: data.indices.len() as u32,
                material: data.material,
            });
        }

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Garment Instance Buffer"),
            contents: bytemuck::cast_slice(&[asset.placement.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Ok(GpuGarment {
            model: Model { meshes, materials },
            instance: asset.placement,
            instance_buffer,
        })
    }

    fn resize(&mut self, window: (u32, u32), viewport: Viewport) {
        self.ctx.resize(window.0, window.1);
        self.viewport = viewport;
        let size = [self.ctx.config.width, self.ctx.config.height];
        self.depth_texture = Texture::create_depth_texture(&self.ctx.device, size, "depth_texture");
        if self.offscreen.is_some() {
            self.offscreen = Some(Texture::create_render_target(
                &self.ctx.device,
                size,
                self.ctx.config.format,
                "offscreen",
            ));
        }
    }

    fn render(&mut self, camera: &Camera, projection: &Projection, garment: Option<&GpuGarment>) -> anyhow::Result<()> {
        let rect = self.stage_rect();
        self.camera.write(&self.ctx.queue, camera, projection);
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let Some(surface) = self.ctx.surface.as_ref() else {
            if let Some(target) = &self.offscreen {
                self.draw(&mut encoder, &target.view, &self.depth_texture.view, rect, garment);
                self.ctx.queue.submit(Some(encoder.finish()));
            }
            return Ok(());
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.ctx.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.draw(&mut encoder, &view, &self.depth_texture.view, rect, garment);
        self.ctx.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn capture(&mut self, camera: &Camera, projection: &Projection, garment: Option<&GpuGarment>) -> anyhow::Result<RgbaImage> {
        let (_, _, width, height) = self.stage_rect();
        self.camera.write(&self.ctx.queue, camera, projection);
        let device = &self.ctx.device;
        let target = Texture::create_render_target(device, [width, height], self.ctx.config.format, "capture");
        let depth = Texture::create_depth_texture(device, [width, height], "capture_depth");
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
        self.draw(
            &mut encoder,
            &target.view,
            &depth.view,
            (0, 0, width, height),
            garment,
        );
        self.ctx.queue.submit(Some(encoder.finish()));
        self.read_back(&target.texture, width, height)
    }

    fn bind_texture(&mut self, garment: &mut GpuGarment, slot: &str, texture: &DesignTexture) -> usize {
        let slots: Vec<usize> = garment.model.slots(slot).collect();
        for &idx in &slots {
            let uploaded = Texture::from_design(&self.ctx.device, &self.ctx.queue, texture);
            let material = &mut garment.model.materials[idx];
            let released = material.replace_texture(&self.ctx.device, uploaded, &self.material_layout);
            released.texture.destroy();
            log::debug!("bound {} to {slot}, released {:?}", texture.label, released.texture.size());
        }
        slots.len()
    }

    fn tint(&mut self, garment: &mut GpuGarment, colour: [f32; 4]) {
        for material in &mut garment.model.materials {
            material.set_tint(&self.ctx.queue, colour);
        }
    }

    fn release(&mut self, garment: GpuGarment) {
        for material in &garment.model.materials {
            material.texture.texture.destroy();
        }
        for mesh in &garment.model.meshes {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
        }
        garment.instance_buffer.destroy();
        log::debug!("released garment with {} meshes", garment.model.meshes.len());
    }

    fn max_texture_dimension(&self) -> u32 {
        self.ctx.device.limits().max_texture_dimension_2d
    }
}
