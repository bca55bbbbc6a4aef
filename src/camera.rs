//! Camera, projection and orbit interaction.
//!
//! [`Camera`] is a look-at camera, [`Projection`] the perspective used for the
//! garment stage and [`OrbitControls`] the pointer-driven controller that
//! rotates the camera around a fixed target with damping and a restricted
//! polar band.

use std::f32::consts::PI;

use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3};

use crate::config::StudioConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Keeps the spherical coordinates away from the poles where look-at degenerates.
const POLAR_EPSILON: f32 = 1e-4;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    /// Moves the camera and points it at `target` in one step.
    pub fn place<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(&mut self, position: P, target: T) {
        self.position = position.into();
        self.target = target.into();
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn from_config(config: &StudioConfig, width: u32, height: u32) -> Self {
        Self::new(width, height, Deg(config.fovy_degrees), config.znear, config.zfar)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// The camera uniform with its GPU buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device) -> Self {
        use wgpu::util::DeviceExt;
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
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
            label: Some("camera_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera: &Camera, projection: &Projection) {
        self.uniform.update_view_proj(camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Orbit-style camera control around a fixed target.
///
/// Pointer drags accumulate a spherical delta which [`OrbitControls::update`]
/// applies a fraction of (the damping factor) every frame, so motion eases
/// out after the pointer is released. The polar angle is clamped into a band
/// on every update.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    damping: f32,
    min_polar: f32,
    max_polar: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    min_distance: f32,
    max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    dragging: bool,
    last_pointer: Option<(f64, f64)>,
}

impl OrbitControls {
    pub fn new(config: &StudioConfig) -> Self {
        let [a, b] = config.polar_band_degrees;
        Self {
            target: config.orbit_target.into(),
            damping: config.damping_factor.clamp(0.0, 1.0),
            min_polar: a.min(b).to_radians(),
            max_polar: a.max(b).to_radians(),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            dragging: false,
            last_pointer: None,
        }
    }

    pub fn polar_band(&self) -> (f32, f32) {
        (self.min_polar, self.max_polar)
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pointer_down(&mut self) {
        self.dragging = true;
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.last_pointer = None;
    }

    /// Feeds an absolute pointer position; rotates only while dragging.
    pub fn pointer_moved(&mut self, x: f64, y: f64, viewport_height: u32) {
        if self.dragging {
            if let Some((last_x, last_y)) = self.last_pointer {
                self.rotate_by_pixels((x - last_x) as f32, (y - last_y) as f32, viewport_height);
            }
            self.last_pointer = Some((x, y));
        }
    }

    /// A full viewport height of drag turns the camera by one revolution.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: u32) {
        let height = viewport_height.max(1) as f32;
        self.delta_theta -= 2.0 * PI * dx / height * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    /// Positive `lines` zoom in.
    pub fn scroll(&mut self, lines: f32) {
        let step = 0.95f32.powf(self.zoom_speed);
        self.scale *= step.powf(lines);
    }

    /// Applies one frame of damped motion to `camera`.
    pub fn update(&mut self, camera: &mut Camera) {
        let offset = camera.position - self.target;
        let radius = offset.magnitude().max(f32::EPSILON);
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        theta += self.delta_theta * self.damping;
        phi += self.delta_phi * self.damping;
        phi = phi
            .clamp(self.min_polar, self.max_polar)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.scale = 1.0;

        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.position = Point3::from_vec(self.target.to_vec() + offset);
        camera.target = self.target;

        self.delta_theta *= 1.0 - self.damping;
        self.delta_phi *= 1.0 - self.damping;
    }

    /// Remaining rotation still to be eased in.
    pub fn pending_rotation(&self) -> (f32, f32) {
        (self.delta_theta, self.delta_phi)
    }
}
