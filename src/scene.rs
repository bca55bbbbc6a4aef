//! The customization view's scene.
//!
//! [`SceneManager`] owns the camera, the orbit controls, the loaded garment and
//! the design state for one activation of the view. It is generic over a
//! [`Renderer`] so the view logic runs unchanged against the wgpu renderer or a
//! recording double in tests.
//!
//! Long-running work (fetching the mesh, decoding uploads) happens elsewhere.
//! The manager hands out tickets when such work starts and accepts the result
//! back through the matching `finish_*` call. A ticket remembers the activation
//! it was issued for; results for a disposed activation are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use image::RgbaImage;

use crate::camera::{Camera, OrbitControls, Projection};
use crate::capture::{CapturedArtifact, CapturedViews};
use crate::compositor::{DecodedImage, DesignTexture, TextPainter, UploadedImage, decode_upload};
use crate::config::{StudioConfig, Viewpoint};
use crate::design::{DesignState, Rgb, Side, TextRequest};
use crate::error::{Result, StudioError};
use crate::resources::GarmentAsset;

/// Rendering backend driven by the scene.
pub trait Renderer {
    /// GPU-side representation of an uploaded garment.
    type Garment;

    fn upload(&mut self, asset: GarmentAsset) -> anyhow::Result<Self::Garment>;

    fn resize(&mut self, window: (u32, u32), viewport: Viewport);

    /// Draws one frame into the presentation surface.
    fn render(
        &mut self,
        camera: &Camera,
        projection: &Projection,
        garment: Option<&Self::Garment>,
    ) -> anyhow::Result<()>;

    /// Forces a render of the viewport and reads the pixels back.
    fn capture(
        &mut self,
        camera: &Camera,
        projection: &Projection,
        garment: Option<&Self::Garment>,
    ) -> anyhow::Result<RgbaImage>;

    /// Binds `texture` to every material named `slot`, releasing what was
    /// bound before. Returns the number of slots that matched.
    fn bind_texture(&mut self, garment: &mut Self::Garment, slot: &str, texture: &DesignTexture) -> usize;

    /// Sets the colour every material of the garment is multiplied with.
    fn tint(&mut self, garment: &mut Self::Garment, colour: [f32; 4]);

    fn release(&mut self, garment: Self::Garment);

    /// Largest edge length a bound texture may have.
    fn max_texture_dimension(&self) -> u32 {
        wgpu::Limits::default().max_texture_dimension_2d
    }
}

/// The part of the window the stage is drawn into, right of the side panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn for_window(width: u32, height: u32, side_panel_width: u32) -> Self {
        let x = side_panel_width.min(width.saturating_sub(1));
        Self {
            x,
            width: width.saturating_sub(x).max(1),
            height: height.max(1),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64 && x < (self.x + self.width) as f64 && y >= 0.0 && y < self.height as f64
    }
}

static ACTIVATIONS: AtomicU64 = AtomicU64::new(0);

/// Identifies one activation of the view.
#[derive(Clone, Debug)]
pub struct ViewToken {
    active: Arc<AtomicBool>,
    generation: u64,
}

impl ViewToken {
    fn issue() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
            generation: ACTIVATIONS.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn is_live(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn revoke(&self) {
        self.active.store(false, Ordering::Release);
    }

    fn same_activation(&self, other: &ViewToken) -> bool {
        self.generation == other.generation && self.is_live()
    }
}

/// Handed out when the garment load starts.
#[derive(Clone, Debug)]
pub struct LoadTicket {
    token: ViewToken,
    pub config: StudioConfig,
}

impl LoadTicket {
    pub fn is_live(&self) -> bool {
        self.token.is_live()
    }
}

/// Handed out when an image upload starts; carries the file to decode.
#[derive(Clone, Debug)]
pub struct UploadTicket {
    token: ViewToken,
    pub side: Side,
    pub upload: UploadedImage,
}

impl UploadTicket {
    pub fn is_live(&self) -> bool {
        self.token.is_live()
    }

    /// Decodes the upload. Synchronous and CPU heavy; run it off the render thread.
    pub fn decode(&self) -> Result<DecodedImage> {
        decode_upload(&self.upload, self.side)
    }
}

pub struct SceneManager<R: Renderer> {
    config: StudioConfig,
    renderer: R,
    camera: Camera,
    projection: Projection,
    controls: OrbitControls,
    viewport: Viewport,
    window_size: (u32, u32),
    scale_factor: f64,
    garment: Option<R::Garment>,
    design: DesignState,
    painter: TextPainter,
    token: ViewToken,
    load_started: bool,
    disposed: bool,
}

impl<R: Renderer> SceneManager<R> {
    /// Sets up the scene for a window of `window_size`. `acquire` creates the
    /// renderer for the computed viewport; when it fails nothing is kept.
    pub fn initialize<F>(config: StudioConfig, window_size: (u32, u32), acquire: F) -> Result<Self>
    where
        F: FnOnce(&StudioConfig, Viewport) -> Result<R>,
    {
        let viewport = Viewport::for_window(window_size.0, window_size.1, config.side_panel_width);
        let renderer = acquire(&config, viewport)?;
        let camera = Camera::new(config.camera_position, config.orbit_target);
        let projection = Projection::from_config(&config, viewport.width, viewport.height);
        let controls = OrbitControls::new(&config);
        let mut painter = TextPainter::new(config.canvas_size, config.font_size);
        painter.load_font_files(&config.font_files);
        let token = ViewToken::issue();
        log::info!(
            "customization view {} initialized with a {}x{} viewport",
            token.generation,
            viewport.width,
            viewport.height
        );

        Ok(Self {
            config,
            renderer,
            camera,
            projection,
            controls,
            viewport,
            window_size,
            scale_factor: 1.0,
            garment: None,
            design: DesignState::default(),
            painter,
            token,
            load_started: false,
            disposed: false,
        })
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn garment(&self) -> Option<&R::Garment> {
        self.garment.as_ref()
    }

    pub fn has_garment(&self) -> bool {
        self.garment.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn token(&self) -> &ViewToken {
        &self.token
    }

    /// Starts the one garment load of this activation. Later calls return `None`.
    pub fn begin_model_load(&mut self) -> Option<LoadTicket> {
        if self.disposed || self.load_started {
            return None;
        }
        self.load_started = true;
        log::info!("loading garment {}", self.config.model_path);
        Some(LoadTicket {
            token: self.token.clone(),
            config: self.config.clone(),
        })
    }

    /// Accepts the outcome of a garment load. Failures are logged and leave the
    /// stage empty.
    pub fn finish_model_load(&mut self, ticket: LoadTicket, result: anyhow::Result<GarmentAsset>) {
        if self.disposed || !ticket.token.same_activation(&self.token) {
            log::debug!("discarding garment load for a disposed view");
            return;
        }
        let asset = match result {
            Ok(asset) => asset,
            Err(e) => {
                let err = StudioError::AssetLoad(format!("{}: {e:#}", ticket.config.model_path));
                log::error!("{err}");
                return;
            }
        };
        match self.renderer.upload(asset) {
            Ok(garment) => {
                if let Some(old) = self.garment.replace(garment) {
                    self.renderer.release(old);
                }
            }
            Err(e) => log::error!("error uploading model: {e:#}"),
        }
    }

    /// Advances the orbit damping and draws one frame. Errors are logged.
    pub fn frame(&mut self) {
        if self.disposed {
            return;
        }
        self.controls.update(&mut self.camera);
        if let Err(e) = self
            .renderer
            .render(&self.camera, &self.projection, self.garment.as_ref())
        {
            log::error!("frame failed: {e:#}");
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.disposed || width == 0 || height == 0 {
            return;
        }
        self.window_size = (width, height);
        self.viewport = Viewport::for_window(width, height, self.config.side_panel_px(self.scale_factor));
        self.projection.resize(self.viewport.width, self.viewport.height);
        self.renderer.resize((width, height), self.viewport);
    }

    /// Sets the window's physical pixels per logical pixel and lays the
    /// viewport out again so the side panel keeps its logical width.
    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        if !scale_factor.is_finite() || scale_factor <= 0.0 || scale_factor == self.scale_factor {
            return;
        }
        self.scale_factor = scale_factor;
        let (width, height) = self.window_size;
        self.resize(width, height);
    }

    /// Starts an orbit drag if the pointer is over the stage.
    pub fn pointer_pressed(&mut self, x: f64, y: f64) {
        if self.viewport.contains(x, y) {
            self.controls.pointer_down();
            self.controls
                .pointer_moved(x, y, self.viewport.height);
        }
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        self.controls.pointer_moved(x, y, self.viewport.height);
    }

    pub fn pointer_released(&mut self) {
        self.controls.pointer_up();
    }

    pub fn scroll(&mut self, lines: f32) {
        self.controls.scroll(lines);
    }

    /// Paints text onto the requested side. Does nothing while no garment is
    /// loaded.
    pub fn apply_text(&mut self, request: &TextRequest) -> Result<()> {
        let Some(garment) = self.garment.as_mut().filter(|_| !self.disposed) else {
            log::debug!("no garment loaded, ignoring text for the {} side", request.side);
            return Ok(());
        };
        let texture = self.painter.paint(request)?;
        bind_side(&mut self.renderer, garment, request.side, texture);
        self.design.record_text(request);
        Ok(())
    }

    /// Validates the selection and returns a ticket to decode it with.
    pub fn begin_image_upload(&self, side: Side, upload: Option<UploadedImage>) -> Result<UploadTicket> {
        let upload = upload.ok_or(StudioError::MissingImage)?;
        Ok(UploadTicket {
            token: self.token.clone(),
            side,
            upload,
        })
    }

    /// Accepts a decoded upload. A failed decode is returned to the caller and
    /// leaves the previous texture and design state untouched.
    pub fn finish_image_upload(&mut self, ticket: UploadTicket, result: Result<DecodedImage>) -> Result<()> {
        if self.disposed || !ticket.token.same_activation(&self.token) {
            log::debug!("discarding decoded image for a disposed view");
            return Ok(());
        }
        let decoded = result?;
        let Some(garment) = self.garment.as_mut() else {
            log::debug!("no garment loaded, ignoring image for the {} side", ticket.side);
            return Ok(());
        };
        let texture = DesignTexture::picture(decoded.image, ticket.side);
        bind_side(&mut self.renderer, garment, ticket.side, texture);
        self.design.record_image(ticket.side, decoded.data_uri);
        Ok(())
    }

    /// Upload, decode and bind in one synchronous step.
    pub fn apply_image(&mut self, side: Side, upload: Option<UploadedImage>) -> Result<()> {
        let ticket = self.begin_image_upload(side, upload)?;
        let decoded = ticket.decode();
        self.finish_image_upload(ticket, decoded)
    }

    /// Tints the whole garment with a `#rrggbb` colour.
    pub fn set_garment_colour(&mut self, hex: &str) -> Result<()> {
        let colour = Rgb::parse(hex)?;
        if let Some(garment) = self.garment.as_mut() {
            self.renderer.tint(garment, colour.to_linear());
        }
        Ok(())
    }

    /// Renders the front viewpoint then the back viewpoint. The camera is left
    /// at the back viewpoint.
    pub fn capture_both_views(&mut self) -> Result<CapturedViews> {
        if self.disposed {
            return Err(StudioError::Capture("view already disposed".to_string()));
        }
        let front = self.capture_view(Side::Front, self.config.front_view)?;
        let back = self.capture_view(Side::Back, self.config.back_view)?;
        Ok(CapturedViews { front, back })
    }

    fn capture_view(&mut self, side: Side, viewpoint: Viewpoint) -> Result<CapturedArtifact> {
        self.camera.place(viewpoint.position, viewpoint.look_at);
        let image = self
            .renderer
            .capture(&self.camera, &self.projection, self.garment.as_ref())
            .map_err(|e| StudioError::Capture(format!("{side} view: {e:#}")))?;
        CapturedArtifact::encode(side, &image)
    }

    pub fn design(&self) -> &DesignState {
        &self.design
    }

    /// Captures both views and bundles them with the design state for the
    /// order flow.
    pub fn hand_off(&mut self) -> Result<HandOff> {
        let views = self.capture_both_views()?;
        Ok(HandOff {
            design: self.design.clone(),
            views,
        })
    }

    /// Releases the garment and invalidates outstanding tickets. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.token.revoke();
        self.controls.pointer_up();
        if let Some(garment) = self.garment.take() {
            self.renderer.release(garment);
        }
        log::info!("customization view {} disposed", self.token.generation);
    }
}

impl<R: Renderer> Drop for SceneManager<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn bind_side<R: Renderer>(renderer: &mut R, garment: &mut R::Garment, side: Side, texture: DesignTexture) {
    let texture = texture.fit_within(renderer.max_texture_dimension());
    let matched = renderer.bind_texture(garment, side.slot_name(), &texture);
    if matched == 0 {
        log::warn!("garment has no material named {:?}", side.slot_name());
    }
}

/// What the customization view passes on to order persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct HandOff {
    pub design: DesignState,
    pub views: CapturedViews,
}
